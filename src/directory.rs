//! The Main Directory: a persistent string-keyed map holding the graph's
//! global bookkeeping — version, partition set, node/edge kind sets,
//! per-kind attribute sets, per-kind spec sets, and per-kind counts
//! (spec §4, §6.2). All keys are logically prefixed with `0x02`.

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::GraphError;
use crate::storage::htree::HTree;

const PREFIX: u8 = 0x02;
const VERSION: u32 = 1;

#[derive(Debug)]
pub struct MainDirectory {
    store: Arc<Mutex<dyn HTree>>,
}

impl MainDirectory {
    pub fn new(store: Arc<Mutex<dyn HTree>>) -> Self {
        let dir = Self { store };
        dir.ensure_version();
        dir
    }

    fn ensure_version(&self) {
        let key = key("ver");
        let mut store = self.store.lock();
        if store.get(&key).is_none() {
            store.put(&key, Bytes::from(VERSION.to_le_bytes().to_vec()));
        }
    }

    pub fn version(&self) -> u32 {
        self.store
            .lock()
            .get(&key("ver"))
            .map(|b| {
                let mut arr = [0u8; 4];
                arr.copy_from_slice(&b[..4]);
                u32::from_le_bytes(arr)
            })
            .unwrap_or(VERSION)
    }

    // --- Partitions -----------------------------------------------------

    pub fn partitions(&self) -> BTreeSet<String> {
        self.get_set(&key("part"))
    }

    pub fn add_partition(&self, partition: &str) -> Result<(), GraphError> {
        self.insert_into_set(&key("part"), partition)
    }

    // --- Node / edge kinds ------------------------------------------------

    pub fn node_kinds(&self) -> BTreeSet<String> {
        self.prefix_suffixes("nodekind")
    }

    pub fn add_node_kind(&self, kind: &str) -> Result<(), GraphError> {
        self.mark_present(&key(&format!("nodekind{kind}")))
    }

    pub fn edge_kinds(&self) -> BTreeSet<String> {
        self.prefix_suffixes("edgekind")
    }

    pub fn add_edge_kind(&self, kind: &str) -> Result<(), GraphError> {
        self.mark_present(&key(&format!("edgekind{kind}")))
    }

    // --- Per-kind attribute sets ------------------------------------------

    pub fn node_attrs(&self, kind: &str) -> BTreeSet<String> {
        self.get_set(&key(&format!("natt{kind}")))
    }

    pub fn add_node_attr(&self, kind: &str, attr: &str) -> Result<(), GraphError> {
        self.insert_into_set(&key(&format!("natt{kind}")), attr)
    }

    pub fn remove_node_attr(&self, kind: &str, attr: &str) -> Result<(), GraphError> {
        self.remove_from_set(&key(&format!("natt{kind}")), attr)
    }

    pub fn edge_attrs(&self, kind: &str) -> BTreeSet<String> {
        self.get_set(&key(&format!("eatt{kind}")))
    }

    pub fn add_edge_attr(&self, kind: &str, attr: &str) -> Result<(), GraphError> {
        self.insert_into_set(&key(&format!("eatt{kind}")), attr)
    }

    pub fn remove_edge_attr(&self, kind: &str, attr: &str) -> Result<(), GraphError> {
        self.remove_from_set(&key(&format!("eatt{kind}")), attr)
    }

    // --- Per-kind node-edge spec sets --------------------------------------

    pub fn node_specs(&self, kind: &str) -> BTreeSet<String> {
        self.get_set(&key(&format!("nrel{kind}")))
    }

    pub fn add_node_spec(&self, kind: &str, spec: &str) -> Result<(), GraphError> {
        self.insert_into_set(&key(&format!("nrel{kind}")), spec)
    }

    // --- Per-kind counts --------------------------------------------------

    pub fn node_count(&self, kind: &str) -> u64 {
        self.get_count(&key(&format!("ncnt{kind}")))
    }

    pub fn set_node_count(&self, kind: &str, count: u64) -> Result<(), GraphError> {
        self.set_count(&key(&format!("ncnt{kind}")), count)
    }

    pub fn incr_node_count(&self, kind: &str, delta: i64) -> Result<(), GraphError> {
        self.adjust_count(&key(&format!("ncnt{kind}")), delta)
    }

    pub fn edge_count(&self, kind: &str) -> u64 {
        self.get_count(&key(&format!("ecnt{kind}")))
    }

    pub fn set_edge_count(&self, kind: &str, count: u64) -> Result<(), GraphError> {
        self.set_count(&key(&format!("ecnt{kind}")), count)
    }

    pub fn incr_edge_count(&self, kind: &str, delta: i64) -> Result<(), GraphError> {
        self.adjust_count(&key(&format!("ecnt{kind}")), delta)
    }

    pub fn flush(&self) -> Result<(), GraphError> {
        self.store.lock().flush()
    }

    pub fn rollback(&self) -> Result<(), GraphError> {
        self.store.lock().rollback()
    }

    // --- helpers -----------------------------------------------------------

    fn mark_present(&self, key: &[u8]) -> Result<(), GraphError> {
        self.store.lock().put(key, Bytes::from_static(b""));
        Ok(())
    }

    fn prefix_suffixes(&self, prefix: &str) -> BTreeSet<String> {
        let full_prefix = key(prefix);
        self.store
            .lock()
            .iter_prefix(&full_prefix)
            .into_iter()
            .map(|(k, _)| String::from_utf8_lossy(&k[full_prefix.len()..]).into_owned())
            .collect()
    }

    fn get_set(&self, key: &[u8]) -> BTreeSet<String> {
        self.store
            .lock()
            .get(key)
            .map(|b| decode_set(&b))
            .unwrap_or_default()
    }

    fn insert_into_set(&self, key: &[u8], item: &str) -> Result<(), GraphError> {
        let mut store = self.store.lock();
        let mut set = store.get(key).map(|b| decode_set(&b)).unwrap_or_default();
        set.insert(item.to_string());
        store.put(key, encode_set(&set));
        Ok(())
    }

    fn remove_from_set(&self, key: &[u8], item: &str) -> Result<(), GraphError> {
        let mut store = self.store.lock();
        let mut set = store.get(key).map(|b| decode_set(&b)).unwrap_or_default();
        set.remove(item);
        store.put(key, encode_set(&set));
        Ok(())
    }

    fn get_count(&self, key: &[u8]) -> u64 {
        self.store
            .lock()
            .get(key)
            .map(|b| {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(&b[..8]);
                u64::from_le_bytes(arr)
            })
            .unwrap_or(0)
    }

    fn set_count(&self, key: &[u8], count: u64) -> Result<(), GraphError> {
        self.store.lock().put(key, Bytes::from(count.to_le_bytes().to_vec()));
        Ok(())
    }

    fn adjust_count(&self, key: &[u8], delta: i64) -> Result<(), GraphError> {
        let mut store = self.store.lock();
        let current = store
            .get(key)
            .map(|b| {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(&b[..8]);
                i64::from_le_bytes(arr)
            })
            .unwrap_or(0);
        let next = (current + delta).max(0) as u64;
        store.put(key, Bytes::from(next.to_le_bytes().to_vec()));
        Ok(())
    }
}

fn key(suffix: &str) -> Vec<u8> {
    let mut k = vec![PREFIX];
    k.extend_from_slice(suffix.as_bytes());
    k
}

fn encode_set(set: &BTreeSet<String>) -> Bytes {
    Bytes::from(
        bincode::serde::encode_to_vec(set, bincode::config::standard())
            .expect("encoding a string set never fails"),
    )
}

fn decode_set(bytes: &[u8]) -> BTreeSet<String> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(s, _)| s)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::htree::MemHTree;

    fn dir() -> MainDirectory {
        MainDirectory::new(Arc::new(Mutex::new(MemHTree::new())))
    }

    #[test]
    fn version_defaults_to_one() {
        assert_eq!(dir().version(), 1);
    }

    #[test]
    fn partitions_round_trip() {
        let d = dir();
        d.add_partition("p1").unwrap();
        d.add_partition("p2").unwrap();
        assert_eq!(
            d.partitions(),
            ["p1", "p2"].into_iter().map(String::from).collect()
        );
    }

    #[test]
    fn node_kinds_are_prefix_enumerable() {
        let d = dir();
        d.add_node_kind("song").unwrap();
        d.add_node_kind("artist").unwrap();
        assert_eq!(
            d.node_kinds(),
            ["artist", "song"].into_iter().map(String::from).collect()
        );
    }

    #[test]
    fn counts_increment_and_decrement() {
        let d = dir();
        d.incr_node_count("song", 1).unwrap();
        d.incr_node_count("song", 1).unwrap();
        assert_eq!(d.node_count("song"), 2);
        d.incr_node_count("song", -1).unwrap();
        assert_eq!(d.node_count("song"), 1);
    }

    #[test]
    fn attr_sets_add_and_remove() {
        let d = dir();
        d.add_node_attr("song", "title").unwrap();
        d.add_node_attr("song", "year").unwrap();
        assert_eq!(
            d.node_attrs("song"),
            ["title", "year"].into_iter().map(String::from).collect()
        );
        d.remove_node_attr("song", "year").unwrap();
        assert_eq!(d.node_attrs("song"), ["title"].into_iter().map(String::from).collect());
    }
}
