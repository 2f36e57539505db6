//! `RollingTransaction`: self-commits its inner [`Transaction`] in the
//! background every `opThreshold` operations, so a long-running batch
//! load doesn't hold one unbounded buffer in memory (spec §4.3).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error::GraphError;
use crate::graph::GraphManager;
use crate::model::{Edge, Node};

use super::Transaction;

pub struct RollingTransaction {
    manager: Arc<GraphManager>,
    op_threshold: usize,
    inner: Mutex<Transaction>,
    ops_since_rollover: AtomicUsize,
    in_flight: Mutex<Vec<(usize, JoinHandle<Result<(), GraphError>>)>>,
}

impl RollingTransaction {
    pub fn new(manager: Arc<GraphManager>, op_threshold: usize) -> Self {
        let op_threshold = op_threshold.max(1);
        Self {
            inner: Mutex::new(Transaction::new(manager.clone())),
            manager,
            op_threshold,
            ops_since_rollover: AtomicUsize::new(0),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    fn bump(&self) {
        let n = self.ops_since_rollover.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= self.op_threshold {
            self.rollover();
        }
    }

    /// Snapshots the inner transaction, installs a fresh empty one, and
    /// dispatches the snapshot to commit on a background task.
    fn rollover(&self) {
        let mut guard = self.inner.lock();
        let pending = guard.pending_count();
        if pending == 0 {
            self.ops_since_rollover.store(0, Ordering::SeqCst);
            return;
        }
        let snapshot = std::mem::replace(&mut *guard, Transaction::new(self.manager.clone()));
        drop(guard);
        self.ops_since_rollover.store(0, Ordering::SeqCst);
        log::debug!("rolling transaction dispatching background commit of {pending} operations");
        let handle = tokio::task::spawn_blocking(move || snapshot.commit());
        self.in_flight.lock().push((pending, handle));
    }

    pub fn store_node(&self, partition: &str, node: Node) {
        self.inner.lock().store_node(partition, node);
        self.bump();
    }

    pub fn update_node(&self, partition: &str, node: Node) -> Result<(), GraphError> {
        self.inner.lock().update_node(partition, node)?;
        self.bump();
        Ok(())
    }

    pub fn remove_node(&self, partition: &str, kind: &str, key: &str) {
        self.inner.lock().remove_node(partition, kind, key);
        self.bump();
    }

    pub fn store_edge(&self, partition: &str, edge: Edge) {
        self.inner.lock().store_edge(partition, edge);
        self.bump();
    }

    pub fn remove_edge(&self, partition: &str, kind: &str, key: &str) {
        self.inner.lock().remove_edge(partition, kind, key);
        self.bump();
    }

    /// Pending (not yet dispatched) plus in-flight (background-committing,
    /// not yet drained) operation count. Prunes handles whose background
    /// commit has already landed, so a caller that never calls `commit`
    /// doesn't see finished work counted as pending forever.
    pub fn pending_count(&self) -> usize {
        let pending = self.inner.lock().pending_count();
        let mut in_flight = self.in_flight.lock();
        in_flight.retain(|(_, handle)| !handle.is_finished());
        let running: usize = in_flight.iter().map(|(n, _)| *n).sum();
        pending + running
    }

    /// Drains every background commit — the wait-group — then commits
    /// whatever remains buffered, returning a composite of any failures.
    pub async fn commit(&self) -> Result<(), GraphError> {
        let handles: Vec<_> = std::mem::take(&mut *self.in_flight.lock());
        let mut errors = Vec::new();
        for (_, handle) in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => errors.push(e),
                Err(join_err) => errors.push(GraphError::Writing(format!("background commit panicked: {join_err}"))),
            }
        }
        let final_txn = std::mem::replace(&mut *self.inner.lock(), Transaction::new(self.manager.clone()));
        if let Err(e) = final_txn.commit() {
            errors.push(e);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GraphError::composite(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::storage::MemGraphStorage;

    fn manager() -> Arc<GraphManager> {
        Arc::new(GraphManager::new(Arc::new(MemGraphStorage::new(false)), EngineConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn rolls_over_and_drains_background_commits() {
        let mgr = manager();
        let txn = RollingTransaction::new(mgr.clone(), 2);
        for i in 0..5 {
            txn.store_node("p", Node::new(format!("n{i}"), "user"));
        }
        txn.commit().await.unwrap();
        assert_eq!(mgr.node_count("user"), 5);
    }

    #[tokio::test]
    async fn pending_count_includes_in_flight() {
        let mgr = manager();
        let txn = RollingTransaction::new(mgr.clone(), 1);
        txn.store_node("p", Node::new("a", "user"));
        assert!(txn.pending_count() >= 1);
        txn.commit().await.unwrap();
        assert_eq!(txn.pending_count(), 0);
    }
}
