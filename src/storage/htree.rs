//! The `HTree` contract — a persistent key-value map with ordered
//! iteration, built (in a real deployment) atop a [`super::manager::StorageManager`]
//! via its root-pointer slots. This module ships [`MemHTree`], an
//! in-memory reference implementation sufficient to exercise every
//! invariant in the graph manager's test suite.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::error::GraphError;

pub trait HTree: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &[u8]) -> Option<Bytes>;
    /// Inserts `value` under `key`, returning the previous value if any.
    fn put(&mut self, key: &[u8], value: Bytes) -> Option<Bytes>;
    /// Removes `key`, returning its value if present.
    fn delete(&mut self, key: &[u8]) -> Option<Bytes>;
    /// All entries whose key starts with `prefix`, in ascending key order.
    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Bytes)>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Commits every write since the last flush/rollback; the container
    /// is no longer able to undo them.
    fn flush(&mut self) -> Result<(), GraphError>;
    /// Undoes every write since the last flush.
    fn rollback(&mut self) -> Result<(), GraphError>;
}

#[derive(Debug)]
enum UndoOp {
    Put(Vec<u8>, Option<Bytes>),
    Delete(Vec<u8>, Bytes),
}

/// A `BTreeMap`-backed `HTree`. Keys sort lexicographically by byte
/// value, which is what makes the spec's "close together" prefix-sharing
/// layout (§3.2) and the deterministic iteration properties (P5) fall
/// out for free.
#[derive(Debug, Default)]
pub struct MemHTree {
    data: BTreeMap<Vec<u8>, Bytes>,
    undo: Vec<UndoOp>,
}

impl MemHTree {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HTree for MemHTree {
    fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.data.get(key).cloned()
    }

    fn put(&mut self, key: &[u8], value: Bytes) -> Option<Bytes> {
        let old = self.data.insert(key.to_vec(), value);
        self.undo.push(UndoOp::Put(key.to_vec(), old.clone()));
        old
    }

    fn delete(&mut self, key: &[u8]) -> Option<Bytes> {
        let old = self.data.remove(key);
        if let Some(v) = old.clone() {
            self.undo.push(UndoOp::Delete(key.to_vec(), v));
        }
        old
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Bytes)> {
        self.data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn flush(&mut self) -> Result<(), GraphError> {
        self.undo.clear();
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), GraphError> {
        while let Some(op) = self.undo.pop() {
            match op {
                UndoOp::Put(k, Some(old)) => {
                    self.data.insert(k, old);
                }
                UndoOp::Put(k, None) => {
                    self.data.remove(&k);
                }
                UndoOp::Delete(k, old) => {
                    self.data.insert(k, old);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let mut t = MemHTree::new();
        assert_eq!(t.put(b"a", Bytes::from_static(b"1")), None);
        assert_eq!(t.get(b"a"), Some(Bytes::from_static(b"1")));
        assert_eq!(t.delete(b"a"), Some(Bytes::from_static(b"1")));
        assert_eq!(t.get(b"a"), None);
    }

    #[test]
    fn prefix_iteration_is_sorted() {
        let mut t = MemHTree::new();
        t.put(b"attr\x02", Bytes::from_static(b"x"));
        t.put(b"attr\x01", Bytes::from_static(b"y"));
        t.put(b"other", Bytes::from_static(b"z"));
        let entries = t.iter_prefix(b"attr");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, b"attr\x01");
        assert_eq!(entries[1].0, b"attr\x02");
    }

    #[test]
    fn rollback_undoes_puts_and_deletes() {
        let mut t = MemHTree::new();
        t.put(b"a", Bytes::from_static(b"1"));
        t.flush().unwrap();
        t.put(b"a", Bytes::from_static(b"2"));
        t.delete(b"a");
        t.put(b"b", Bytes::from_static(b"3"));
        t.rollback().unwrap();
        assert_eq!(t.get(b"a"), Some(Bytes::from_static(b"1")));
        assert_eq!(t.get(b"b"), None);
    }
}
