//! `ConcurrentTransaction`: the baseline [`super::Transaction`] behind a
//! single mutex, so callers that share one transaction across threads
//! don't need to coordinate access themselves (spec §4.3).

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::GraphError;
use crate::graph::GraphManager;
use crate::model::{Edge, Node};

use super::Transaction;

pub struct ConcurrentTransaction {
    inner: Mutex<Option<Transaction>>,
}

impl ConcurrentTransaction {
    pub fn new(manager: Arc<GraphManager>) -> Self {
        Self { inner: Mutex::new(Some(Transaction::new(manager))) }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Transaction) -> R) -> R {
        let mut guard = self.inner.lock();
        let txn = guard.as_mut().expect("operation on an already-committed transaction");
        f(txn)
    }

    pub fn store_node(&self, partition: &str, node: Node) {
        self.with(|t| t.store_node(partition, node))
    }

    pub fn update_node(&self, partition: &str, node: Node) -> Result<(), GraphError> {
        self.with(|t| t.update_node(partition, node))
    }

    pub fn remove_node(&self, partition: &str, kind: &str, key: &str) {
        self.with(|t| t.remove_node(partition, kind, key))
    }

    pub fn store_edge(&self, partition: &str, edge: Edge) {
        self.with(|t| t.store_edge(partition, edge))
    }

    pub fn remove_edge(&self, partition: &str, kind: &str, key: &str) {
        self.with(|t| t.remove_edge(partition, kind, key))
    }

    pub fn pending_count(&self) -> usize {
        self.with(|t| t.pending_count())
    }

    /// Takes the buffered transaction out and commits it. Further calls
    /// on this handle panic — a committed transaction is not reusable.
    pub fn commit(&self) -> Result<(), GraphError> {
        let txn = self.inner.lock().take().expect("transaction already committed");
        txn.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::storage::MemGraphStorage;

    #[test]
    fn serializes_buffered_ops_and_commits() {
        let mgr = Arc::new(GraphManager::new(Arc::new(MemGraphStorage::new(false)), EngineConfig::default()).unwrap());
        let txn = ConcurrentTransaction::new(mgr.clone());
        txn.store_node("p", Node::new("A", "user"));
        assert_eq!(txn.pending_count(), 1);
        txn.commit().unwrap();
        assert_eq!(mgr.node_count("user"), 1);
    }
}
