//! The Graph Manager (spec §4.2): node/edge read, write, remove,
//! traverse, count, and spec enumeration over the layered key scheme of
//! §3. Holds the single reader/writer lock (spec §5) and the container
//! registry; [`node`] and [`edge`] add the per-entity operations as
//! separate `impl GraphManager` blocks, mirroring the teacher's
//! `impls/{node,edge}.rs` split.

pub mod edge;
pub mod iterator;
pub mod node;
pub mod query;
pub mod spec;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::{validate_name, EngineConfig};
use crate::container::Container;
use crate::directory::MainDirectory;
use crate::error::GraphError;
use crate::model::Node;
use crate::names::NamesManager;
use crate::rules::EventBus;
use crate::storage::{suffix_edge_idx, suffix_edges, suffix_node_idx, suffix_nodes, GraphStorage};

pub use iterator::NodeKeyIterator;
pub use query::IndexQuery;

/// The engine entry point. Construct one per open graph; it owns the
/// storage handle, the names dictionary, the main directory, the rule
/// bus, and every per-(partition, kind) container created so far.
pub struct GraphManager {
    storage: Arc<dyn GraphStorage>,
    names: NamesManager,
    directory: MainDirectory,
    config: EngineConfig,
    events: EventBus,
    lock: RwLock<()>,
    creation_lock: Mutex<()>,
    containers: Mutex<HashMap<String, Arc<Container>>>,
}

impl GraphManager {
    pub fn new(storage: Arc<dyn GraphStorage>, config: EngineConfig) -> Result<Self, GraphError> {
        let names_store = storage
            .htree("__names", true)?
            .expect("htree(create=true) always returns Some");
        Ok(Self {
            directory: MainDirectory::new(storage.main_db()),
            names: NamesManager::new(names_store),
            storage,
            config,
            events: EventBus::with_builtins(),
            lock: RwLock::new(()),
            creation_lock: Mutex::new(()),
            containers: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn directory(&self) -> &MainDirectory {
        &self.directory
    }

    pub(crate) fn names(&self) -> &NamesManager {
        &self.names
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    /// Acquires the engine's single writer lock. Held by the caller for
    /// the duration of a top-level write or a whole transaction commit —
    /// `_locked` methods never acquire it themselves, so rule-triggered
    /// recursive calls (e.g. a cascading delete) reuse the same guard.
    pub(crate) fn acquire_writer(&self) -> parking_lot::RwLockWriteGuard<'_, ()> {
        self.lock.write()
    }

    pub(crate) fn acquire_reader(&self) -> parking_lot::RwLockReadGuard<'_, ()> {
        self.lock.read()
    }

    pub fn node_count(&self, kind: &str) -> u64 {
        self.directory.node_count(kind)
    }

    pub fn edge_count(&self, kind: &str) -> u64 {
        self.directory.edge_count(kind)
    }

    pub fn partitions(&self) -> Vec<String> {
        self.directory.partitions().into_iter().collect()
    }

    pub fn node_kinds(&self) -> Vec<String> {
        self.directory.node_kinds().into_iter().collect()
    }

    pub fn edge_kinds(&self) -> Vec<String> {
        self.directory.edge_kinds().into_iter().collect()
    }

    /// `DeclareKind` (spec §4.2 supplemental, §5): registers `kind` in
    /// the declared role (node or edge) and creates its containers if
    /// absent, serialized by the container-creation mutex.
    pub fn declare_kind(&self, partition: &str, kind: &str, is_edge: bool) -> Result<(), GraphError> {
        let _writer = self.lock.write();
        match self.declare_kind_locked(partition, kind, is_edge) {
            Ok(()) => {
                self.flush_all();
                Ok(())
            }
            Err(e) => {
                let _ = self.rollback_all();
                Err(e)
            }
        }
    }

    pub(crate) fn declare_kind_locked(&self, partition: &str, kind: &str, is_edge: bool) -> Result<(), GraphError> {
        validate_name("partition", partition)?;
        validate_name("kind", kind)?;
        let _creation = self.creation_lock.lock();
        self.directory.add_partition(partition)?;
        if is_edge {
            self.edge_container(partition, kind, true)?;
            self.directory.add_edge_kind(kind)?;
        } else {
            self.node_container(partition, kind, true)?;
            self.directory.add_node_kind(kind)?;
        }
        Ok(())
    }

    /// Flushes every container opened so far, plus the main directory and
    /// the names dictionary, committing whatever has been mutated since
    /// the last flush. Every public write wraps its `_locked` call with
    /// this on success — called once per top-level operation (or once per
    /// transaction commit), never per sub-step, so a rule-triggered chain
    /// of writes (e.g. a cascading delete) commits atomically with the
    /// write that triggered it.
    ///
    /// Per [`GraphError::Flushing`]'s doc, a flush failure here means
    /// storage has diverged from the in-memory state a caller already
    /// observed as committed — unrecoverable, so this panics rather than
    /// returning an error.
    pub(crate) fn flush_all(&self) {
        for container in self.containers.lock().values() {
            container.flush().expect("flush after a committed write must not fail");
        }
        self.directory.flush().expect("flush after a committed write must not fail");
        self.names.flush().expect("flush after a committed write must not fail");
    }

    /// Rolls back every container opened so far, plus the main directory,
    /// undoing whatever has mutated since the last flush. Paired with
    /// [`flush_all`](Self::flush_all) to give a top-level write or a
    /// transaction commit all-or-nothing semantics without threading a
    /// touched-container set through every rule and sub-operation.
    pub(crate) fn rollback_all(&self) -> Result<(), GraphError> {
        let mut errors = Vec::new();
        for container in self.containers.lock().values() {
            if let Err(e) = container.rollback() {
                errors.push(e);
            }
        }
        if let Err(e) = self.directory.rollback() {
            errors.push(e);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GraphError::composite(errors))
        }
    }

    fn get_or_create_container(
        &self,
        data_name: String,
        index_name: String,
        create: bool,
    ) -> Result<Option<Arc<Container>>, GraphError> {
        let mut containers = self.containers.lock();
        if let Some(c) = containers.get(&data_name) {
            return Ok(Some(c.clone()));
        }
        if !create {
            return Ok(None);
        }
        let data = self
            .storage
            .htree(&data_name, true)?
            .expect("htree(create=true) always returns Some");
        let index = self
            .storage
            .index_manager(&index_name, true)?
            .expect("index_manager(create=true) always returns Some");
        let container = Arc::new(Container::new(data, index));
        containers.insert(data_name, container.clone());
        Ok(Some(container))
    }

    pub(crate) fn node_container(
        &self,
        partition: &str,
        kind: &str,
        create: bool,
    ) -> Result<Option<Arc<Container>>, GraphError> {
        self.get_or_create_container(suffix_nodes(partition, kind), suffix_node_idx(partition, kind), create)
    }

    pub(crate) fn edge_container(
        &self,
        partition: &str,
        kind: &str,
        create: bool,
    ) -> Result<Option<Arc<Container>>, GraphError> {
        self.get_or_create_container(suffix_edges(partition, kind), suffix_edge_idx(partition, kind), create)
    }

    pub fn node_key_iterator(&self, partition: &str, kind: &str) -> Result<NodeKeyIterator, GraphError> {
        let _reader = self.lock.read();
        let container = self.node_container(partition, kind, false)?;
        Ok(NodeKeyIterator::new(container))
    }

    /// Same cursor as [`node_key_iterator`](Self::node_key_iterator) but
    /// over one edge-kind container — edges are keyed exactly like nodes
    /// (spec §3.2, last paragraph).
    pub fn edge_key_iterator(&self, partition: &str, kind: &str) -> Result<NodeKeyIterator, GraphError> {
        let _reader = self.lock.read();
        let container = self.edge_container(partition, kind, false)?;
        Ok(NodeKeyIterator::new(container))
    }

    pub fn node_index_query(&self, partition: &str, kind: &str) -> Result<Option<IndexQuery>, GraphError> {
        let _reader = self.lock.read();
        Ok(self.node_container(partition, kind, false)?.map(|c| IndexQuery::new(c.index.clone())))
    }

    pub fn edge_index_query(&self, partition: &str, kind: &str) -> Result<Option<IndexQuery>, GraphError> {
        let _reader = self.lock.read();
        Ok(self.edge_container(partition, kind, false)?.map(|c| IndexQuery::new(c.index.clone())))
    }
}

/// A plain node reconstructed from a target descriptor, used by
/// `Traverse`'s `allData = false` path (spec §4.2).
pub(crate) fn synthetic_target_node(target_key: &str, target_kind: &str) -> Node {
    Node::new(target_key, target_kind)
}
