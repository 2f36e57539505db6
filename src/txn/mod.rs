//! The Transaction Engine (spec §4.3): a buffered set of pending stores
//! and removes applied to the graph as one all-or-nothing unit.
//!
//! [`Transaction`] is the baseline, single-threaded buffer;
//! [`concurrent::ConcurrentTransaction`] serializes it behind a mutex for
//! callers sharing one transaction across threads; [`rolling::RollingTransaction`]
//! wraps it again to self-commit in the background once a buffered
//! transaction grows past a configured size.

pub mod concurrent;
pub mod rolling;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::GraphError;
use crate::graph::GraphManager;
use crate::model::{Edge, Node};

pub use concurrent::ConcurrentTransaction;
pub use rolling::RollingTransaction;

type ItemKey = (String, String, String);

fn item_key(partition: &str, kind: &str, key: &str) -> ItemKey {
    (partition.to_string(), kind.to_string(), key.to_string())
}

#[derive(Clone)]
struct PendingNode {
    node: Node,
    merge: bool,
}

/// A buffered batch of node/edge stores and removes, keyed by
/// `(partition, kind, key)` so a later op on the same item supersedes an
/// earlier one instead of stacking up.
pub struct Transaction {
    manager: Arc<GraphManager>,
    is_sub_transaction: bool,
    node_stores: BTreeMap<ItemKey, PendingNode>,
    node_removes: BTreeMap<ItemKey, ()>,
    edge_stores: BTreeMap<ItemKey, Edge>,
    edge_removes: BTreeMap<ItemKey, ()>,
}

impl Transaction {
    pub fn new(manager: Arc<GraphManager>) -> Self {
        Self::with_mode(manager, false)
    }

    /// A transaction issued from inside a rule's own `handle` (e.g. the
    /// cascading-delete rule removing incident edges). Per spec §5 and
    /// §9 "Sub-transactions", this must not re-acquire the writer lock —
    /// the originating op already holds it.
    pub(crate) fn new_sub(manager: Arc<GraphManager>) -> Self {
        Self::with_mode(manager, true)
    }

    fn with_mode(manager: Arc<GraphManager>, is_sub_transaction: bool) -> Self {
        Self {
            manager,
            is_sub_transaction,
            node_stores: BTreeMap::new(),
            node_removes: BTreeMap::new(),
            edge_stores: BTreeMap::new(),
            edge_removes: BTreeMap::new(),
        }
    }

    pub fn store_node(&mut self, partition: &str, node: Node) {
        let k = item_key(partition, &node.kind, &node.key);
        self.node_removes.remove(&k);
        self.node_stores.insert(k, PendingNode { node, merge: false });
    }

    /// Merges `node`'s attributes against whatever this transaction
    /// already knows about the item: a still-pending store in this same
    /// transaction, or (failing that) the node as currently stored.
    pub fn update_node(&mut self, partition: &str, node: Node) -> Result<(), GraphError> {
        let k = item_key(partition, &node.kind, &node.key);
        self.node_removes.remove(&k);
        let mut base = if let Some(pending) = self.node_stores.get(&k) {
            pending.node.clone()
        } else {
            self.manager
                .fetch_node(partition, &node.kind, &node.key, None)?
                .unwrap_or_else(|| Node::new(node.key.clone(), node.kind.clone()))
        };
        for (name, value) in node.attrs {
            base.attrs.insert(name, value);
        }
        self.node_stores.insert(k, PendingNode { node: base, merge: true });
        Ok(())
    }

    pub fn remove_node(&mut self, partition: &str, kind: &str, key: &str) {
        let k = item_key(partition, kind, key);
        self.node_stores.remove(&k);
        self.node_removes.insert(k, ());
    }

    pub fn store_edge(&mut self, partition: &str, edge: Edge) {
        let k = item_key(partition, &edge.kind, &edge.key);
        self.edge_removes.remove(&k);
        self.edge_stores.insert(k, edge);
    }

    pub fn remove_edge(&mut self, partition: &str, kind: &str, key: &str) {
        let k = item_key(partition, kind, key);
        self.edge_stores.remove(&k);
        self.edge_removes.insert(k, ());
    }

    /// The number of buffered operations awaiting commit.
    pub fn pending_count(&self) -> usize {
        self.node_stores.len() + self.node_removes.len() + self.edge_stores.len() + self.edge_removes.len()
    }

    /// Applies every buffered operation — nodes before edges, stores
    /// before removes within each (spec §5 "Ordering guarantees") — and
    /// either flushes or rolls back every container touched, as one unit.
    pub fn commit(self) -> Result<(), GraphError> {
        let _writer = if self.is_sub_transaction {
            None
        } else {
            Some(self.manager.acquire_writer())
        };

        match self.apply() {
            Ok(()) => {
                self.manager.flush_all();
                Ok(())
            }
            Err(e) => match self.manager.rollback_all() {
                Ok(()) => Err(e),
                Err(rollback_err) => Err(GraphError::composite(vec![e, rollback_err])),
            },
        }
    }

    fn apply(&self) -> Result<(), GraphError> {
        for (key, pending) in &self.node_stores {
            self.manager.store_node_locked(&key.0, pending.node.clone(), pending.merge)?;
        }
        for key in self.node_removes.keys() {
            self.manager.remove_node_locked(&key.0, &key.1, &key.2)?;
        }
        for (key, edge) in &self.edge_stores {
            self.manager.store_edge_locked(&key.0, edge.clone())?;
        }
        for key in self.edge_removes.keys() {
            self.manager.remove_edge_locked(&key.0, &key.1, &key.2)?;
        }
        Ok(())
    }
}
