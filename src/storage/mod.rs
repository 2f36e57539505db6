//! The out-of-scope storage layer the graph manager is built on: the
//! slot-allocating [`manager::StorageManager`], the persistent
//! [`htree::HTree`] map, the [`index::IndexManager`], and the
//! [`GraphStorage`] abstraction that ties named instances of all three
//! together for one engine (spec §6.1, §6.3).

pub mod htree;
pub mod index;
pub mod manager;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::GraphError;
use htree::{HTree, MemHTree};
use index::{IndexManager, MemIndexManager};
use manager::{MemStorageManager, StorageManager};

/// Container-suffix helpers (spec §6.3): `{part}{kind}.nodes`,
/// `{part}{kind}.nodeidx`, `{part}{kind}.edges`, `{part}{kind}.edgeidx`.
pub fn suffix_nodes(partition: &str, kind: &str) -> String {
    format!("{partition}{kind}.nodes")
}
pub fn suffix_node_idx(partition: &str, kind: &str) -> String {
    format!("{partition}{kind}.nodeidx")
}
pub fn suffix_edges(partition: &str, kind: &str) -> String {
    format!("{partition}{kind}.edges")
}
pub fn suffix_edge_idx(partition: &str, kind: &str) -> String {
    format!("{partition}{kind}.edgeidx")
}

/// Ties named storage managers, HTrees, and index managers together for
/// one graph. `MainDB`/`FlushMain`/`RollbackMain` back the Main Directory
/// (spec §6.2); `storage_manager`/`htree`/`index_manager` back per-kind
/// containers (spec §6.3).
pub trait GraphStorage: Send + Sync {
    fn main_db(&self) -> Arc<Mutex<dyn HTree>>;
    fn flush_main(&self) -> Result<(), GraphError>;
    fn rollback_main(&self) -> Result<(), GraphError>;

    fn storage_manager(
        &self,
        name: &str,
        create: bool,
    ) -> Result<Option<Arc<Mutex<dyn StorageManager>>>, GraphError>;

    fn htree(&self, name: &str, create: bool) -> Result<Option<Arc<Mutex<dyn HTree>>>, GraphError>;

    fn index_manager(
        &self,
        name: &str,
        create: bool,
    ) -> Result<Option<Arc<Mutex<dyn IndexManager>>>, GraphError>;

    fn close(&self) -> Result<(), GraphError>;
}

/// The in-memory reference [`GraphStorage`]. Every container is backed
/// by a [`MemHTree`]; index containers additionally get a
/// [`MemIndexManager`] seeded with the engine's case-sensitivity setting.
pub struct MemGraphStorage {
    main: Arc<Mutex<dyn HTree>>,
    managers: Mutex<HashMap<String, Arc<Mutex<dyn StorageManager>>>>,
    htrees: Mutex<HashMap<String, Arc<Mutex<dyn HTree>>>>,
    indexes: Mutex<HashMap<String, Arc<Mutex<dyn IndexManager>>>>,
    index_case_sensitive: bool,
}

impl MemGraphStorage {
    pub fn new(index_case_sensitive: bool) -> Self {
        Self {
            main: Arc::new(Mutex::new(MemHTree::new())),
            managers: Mutex::new(HashMap::new()),
            htrees: Mutex::new(HashMap::new()),
            indexes: Mutex::new(HashMap::new()),
            index_case_sensitive,
        }
    }
}

impl GraphStorage for MemGraphStorage {
    fn main_db(&self) -> Arc<Mutex<dyn HTree>> {
        self.main.clone()
    }

    fn flush_main(&self) -> Result<(), GraphError> {
        self.main.lock().flush()
    }

    fn rollback_main(&self) -> Result<(), GraphError> {
        self.main.lock().rollback()
    }

    fn storage_manager(
        &self,
        name: &str,
        create: bool,
    ) -> Result<Option<Arc<Mutex<dyn StorageManager>>>, GraphError> {
        let mut managers = self.managers.lock();
        if let Some(m) = managers.get(name) {
            return Ok(Some(m.clone()));
        }
        if !create {
            return Ok(None);
        }
        let m: Arc<Mutex<dyn StorageManager>> = Arc::new(Mutex::new(MemStorageManager::new()));
        managers.insert(name.to_string(), m.clone());
        Ok(Some(m))
    }

    fn htree(&self, name: &str, create: bool) -> Result<Option<Arc<Mutex<dyn HTree>>>, GraphError> {
        let mut htrees = self.htrees.lock();
        if let Some(t) = htrees.get(name) {
            return Ok(Some(t.clone()));
        }
        if !create {
            return Ok(None);
        }
        let t: Arc<Mutex<dyn HTree>> = Arc::new(Mutex::new(MemHTree::new()));
        htrees.insert(name.to_string(), t.clone());
        Ok(Some(t))
    }

    fn index_manager(
        &self,
        name: &str,
        create: bool,
    ) -> Result<Option<Arc<Mutex<dyn IndexManager>>>, GraphError> {
        let mut indexes = self.indexes.lock();
        if let Some(i) = indexes.get(name) {
            return Ok(Some(i.clone()));
        }
        if !create {
            return Ok(None);
        }
        let i: Arc<Mutex<dyn IndexManager>> =
            Arc::new(Mutex::new(MemIndexManager::new(self.index_case_sensitive)));
        indexes.insert(name.to_string(), i.clone());
        Ok(Some(i))
    }

    fn close(&self) -> Result<(), GraphError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn htree_is_created_once_per_name() {
        let storage = MemGraphStorage::new(false);
        let a = storage.htree("part1k1.nodes", true).unwrap().unwrap();
        let b = storage.htree("part1k1.nodes", false).unwrap().unwrap();
        a.lock().put(b"x", bytes::Bytes::from_static(b"1"));
        assert_eq!(b.lock().get(b"x"), Some(bytes::Bytes::from_static(b"1")));
    }

    #[test]
    fn htree_absent_without_create_returns_none() {
        let storage = MemGraphStorage::new(false);
        assert!(storage.htree("missing", false).unwrap().is_none());
    }
}
