//! Per-(partition, kind) containers: the `HTree`-backed key layout of
//! spec §3.2, wired to a dedicated full-text index. Edges are stored
//! under exactly the same `attrs`/`attr` scheme as nodes (spec §3.2,
//! last paragraph) — `Container` is used for both roles.
//!
//! The spec separates a "primary" HTree (root slot 2: attrs/specs/edge
//! adjacency) from a "secondary" HTree (root slot 3: node values) per
//! storage manager file. Our reference `HTree` has no placement-related
//! performance motive to keep them apart, so both live in the one
//! `HTree` passed to [`Container::new`] — see DESIGN.md.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::GraphError;
use crate::model::TargetDescriptor;
use crate::storage::htree::HTree;
use crate::storage::index::IndexManager;
use crate::value::Value;

const TAG_ATTRS: u8 = 0x01;
const TAG_ATTR: u8 = 0x02;
const TAG_SPECS: u8 = 0x03;
const TAG_EDGE: u8 = 0x04;

pub struct Container {
    pub data: Arc<Mutex<dyn HTree>>,
    pub index: Arc<Mutex<dyn IndexManager>>,
}

impl Container {
    pub fn new(data: Arc<Mutex<dyn HTree>>, index: Arc<Mutex<dyn IndexManager>>) -> Self {
        Self { data, index }
    }

    fn attrs_key(key: &str) -> Vec<u8> {
        let mut k = vec![TAG_ATTRS];
        k.extend_from_slice(key.as_bytes());
        k
    }

    fn attr_key(key: &str, code: &[u8]) -> Vec<u8> {
        let mut k = vec![TAG_ATTR];
        k.extend_from_slice(key.as_bytes());
        k.extend_from_slice(code);
        k
    }

    fn specs_key(key: &str) -> Vec<u8> {
        let mut k = vec![TAG_SPECS];
        k.extend_from_slice(key.as_bytes());
        k
    }

    fn edge_key(key: &str, spec_code: &[u8]) -> Vec<u8> {
        let mut k = vec![TAG_EDGE];
        k.extend_from_slice(key.as_bytes());
        k.extend_from_slice(spec_code);
        k
    }

    /// Whether an `attrs` entry is present for `key` — the existence
    /// check used by invariant I3.
    pub fn exists(&self, key: &str) -> bool {
        self.data.lock().get(&Self::attrs_key(key)).is_some()
    }

    pub fn get_attr_codes(&self, key: &str) -> BTreeSet<Vec<u8>> {
        self.data
            .lock()
            .get(&Self::attrs_key(key))
            .map(|b| decode_code_set(&b))
            .unwrap_or_default()
    }

    pub fn put_attr_codes(&self, key: &str, codes: &BTreeSet<Vec<u8>>) {
        self.data.lock().put(&Self::attrs_key(key), encode_code_set(codes));
    }

    pub fn delete_attr_codes(&self, key: &str) {
        self.data.lock().delete(&Self::attrs_key(key));
    }

    pub fn get_attr_value(&self, key: &str, code: &[u8]) -> Result<Option<Value>, GraphError> {
        match self.data.lock().get(&Self::attr_key(key, code)) {
            Some(b) => Ok(Some(crate::value::decode(&b)?)),
            None => Ok(None),
        }
    }

    /// Writes `value` under `(key, code)`, returning the previous value
    /// if any.
    pub fn put_attr_value(
        &self,
        key: &str,
        code: &[u8],
        value: &Value,
    ) -> Result<Option<Value>, GraphError> {
        let encoded = crate::value::encode(value)?;
        let old = self.data.lock().put(&Self::attr_key(key, code), Bytes::from(encoded));
        Ok(match old {
            Some(b) => Some(crate::value::decode(&b)?),
            None => None,
        })
    }

    pub fn delete_attr_value(&self, key: &str, code: &[u8]) -> Result<Option<Value>, GraphError> {
        let old = self.data.lock().delete(&Self::attr_key(key, code));
        Ok(match old {
            Some(b) => Some(crate::value::decode(&b)?),
            None => None,
        })
    }

    pub fn get_specs(&self, key: &str) -> BTreeSet<Vec<u8>> {
        self.data
            .lock()
            .get(&Self::specs_key(key))
            .map(|b| decode_code_set(&b))
            .unwrap_or_default()
    }

    pub fn put_specs(&self, key: &str, specs: &BTreeSet<Vec<u8>>) {
        if specs.is_empty() {
            self.data.lock().delete(&Self::specs_key(key));
        } else {
            self.data.lock().put(&Self::specs_key(key), encode_code_set(specs));
        }
    }

    pub fn get_edge_map(&self, key: &str, spec_code: &[u8]) -> BTreeMap<String, TargetDescriptor> {
        self.data
            .lock()
            .get(&Self::edge_key(key, spec_code))
            .map(|b| decode_edge_map(&b))
            .unwrap_or_default()
    }

    pub fn put_edge_map(&self, key: &str, spec_code: &[u8], map: &BTreeMap<String, TargetDescriptor>) {
        if map.is_empty() {
            self.data.lock().delete(&Self::edge_key(key, spec_code));
        } else {
            self.data.lock().put(&Self::edge_key(key, spec_code), encode_edge_map(map));
        }
    }

    /// All node keys currently present, in ascending order (the
    /// `NodeKeyIterator`'s backing sequence).
    pub fn all_keys(&self) -> Vec<String> {
        self.data
            .lock()
            .iter_prefix(&[TAG_ATTRS])
            .into_iter()
            .map(|(k, _)| String::from_utf8_lossy(&k[1..]).into_owned())
            .collect()
    }

    pub fn flush(&self) -> Result<(), GraphError> {
        self.data.lock().flush()
    }

    pub fn rollback(&self) -> Result<(), GraphError> {
        self.data.lock().rollback()
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct WireTargetDescriptor {
    target_key: String,
    target_kind: String,
    cascade_to_target: bool,
    cascade_last_to_target: bool,
    cascade_from_target: bool,
    cascade_last_from_target: bool,
}

impl From<&TargetDescriptor> for WireTargetDescriptor {
    fn from(t: &TargetDescriptor) -> Self {
        Self {
            target_key: t.target_key.clone(),
            target_kind: t.target_kind.clone(),
            cascade_to_target: t.cascade_to_target,
            cascade_last_to_target: t.cascade_last_to_target,
            cascade_from_target: t.cascade_from_target,
            cascade_last_from_target: t.cascade_last_from_target,
        }
    }
}

impl From<WireTargetDescriptor> for TargetDescriptor {
    fn from(t: WireTargetDescriptor) -> Self {
        Self {
            target_key: t.target_key,
            target_kind: t.target_kind,
            cascade_to_target: t.cascade_to_target,
            cascade_last_to_target: t.cascade_last_to_target,
            cascade_from_target: t.cascade_from_target,
            cascade_last_from_target: t.cascade_last_from_target,
        }
    }
}

fn encode_code_set(set: &BTreeSet<Vec<u8>>) -> Bytes {
    Bytes::from(
        bincode::serde::encode_to_vec(set, bincode::config::standard())
            .expect("encoding a code set never fails"),
    )
}

fn decode_code_set(bytes: &[u8]) -> BTreeSet<Vec<u8>> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(s, _)| s)
        .unwrap_or_default()
}

fn encode_edge_map(map: &BTreeMap<String, TargetDescriptor>) -> Bytes {
    let wire: BTreeMap<String, WireTargetDescriptor> =
        map.iter().map(|(k, v)| (k.clone(), v.into())).collect();
    Bytes::from(
        bincode::serde::encode_to_vec(&wire, bincode::config::standard())
            .expect("encoding an edge map never fails"),
    )
}

fn decode_edge_map(bytes: &[u8]) -> BTreeMap<String, TargetDescriptor> {
    bincode::serde::decode_from_slice::<BTreeMap<String, WireTargetDescriptor>, _>(
        bytes,
        bincode::config::standard(),
    )
    .map(|(wire, _)| wire.into_iter().map(|(k, v)| (k, v.into())).collect())
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::htree::MemHTree;
    use crate::storage::index::MemIndexManager;

    fn container() -> Container {
        Container::new(
            Arc::new(Mutex::new(MemHTree::new())),
            Arc::new(Mutex::new(MemIndexManager::new(false))),
        )
    }

    #[test]
    fn attr_codes_round_trip() {
        let c = container();
        let mut codes = BTreeSet::new();
        codes.insert(vec![0, 0, 0, 1]);
        c.put_attr_codes("n1", &codes);
        assert!(c.exists("n1"));
        assert_eq!(c.get_attr_codes("n1"), codes);
    }

    #[test]
    fn attr_value_round_trip() {
        let c = container();
        let code = vec![0, 0, 0, 1];
        let old = c.put_attr_value("n1", &code, &Value::Str("hi".into())).unwrap();
        assert_eq!(old, None);
        assert_eq!(c.get_attr_value("n1", &code).unwrap(), Some(Value::Str("hi".into())));
        let old2 = c.put_attr_value("n1", &code, &Value::Str("bye".into())).unwrap();
        assert_eq!(old2, Some(Value::Str("hi".into())));
    }

    #[test]
    fn edge_map_round_trip() {
        let c = container();
        let spec_code = vec![0u8; 8];
        let mut map = BTreeMap::new();
        map.insert(
            "e1".to_string(),
            TargetDescriptor {
                target_key: "B".into(),
                target_kind: "k".into(),
                cascade_to_target: false,
                cascade_last_to_target: false,
                cascade_from_target: false,
                cascade_last_from_target: false,
            },
        );
        c.put_edge_map("A", &spec_code, &map);
        assert_eq!(c.get_edge_map("A", &spec_code), map);
        c.put_edge_map("A", &spec_code, &BTreeMap::new());
        assert!(c.get_edge_map("A", &spec_code).is_empty());
    }

    #[test]
    fn all_keys_sorted() {
        let c = container();
        c.put_attr_codes("b", &BTreeSet::new());
        c.put_attr_codes("a", &BTreeSet::new());
        assert_eq!(c.all_keys(), vec!["a".to_string(), "b".to_string()]);
    }
}
