//! The Storage Manager contract (spec §6.1) — the out-of-scope
//! slot-allocating block store every `HTree` is ultimately built on.
//!
//! This module ships one in-memory reference implementation,
//! [`MemStorageManager`], good enough to exercise the contract in tests.
//! A real deployment swaps in a disk-backed implementation behind the
//! same trait.

use bytes::Bytes;

use crate::error::GraphError;

/// An opaque location returned by [`StorageManager::insert`] and consumed
/// by every other operation.
pub type Loc = u64;

/// Root slot for the primary `HTree` (attributes, adjacency, edge rows).
pub const ROOT_PRIMARY: u8 = 2;
/// Root slot for the secondary `HTree` (node values).
pub const ROOT_SECONDARY: u8 = 3;

pub trait StorageManager: Send + Sync + std::fmt::Debug {
    fn insert(&mut self, value: Bytes) -> Result<Loc, GraphError>;
    fn fetch(&self, loc: Loc) -> Result<Bytes, GraphError>;
    fn update(&mut self, loc: Loc, value: Bytes) -> Result<(), GraphError>;
    fn free(&mut self, loc: Loc) -> Result<(), GraphError>;
    fn root(&self, slot: u8) -> Result<Option<Loc>, GraphError>;
    fn set_root(&mut self, slot: u8, loc: Loc) -> Result<(), GraphError>;
    fn flush(&mut self) -> Result<(), GraphError>;
    fn rollback(&mut self) -> Result<(), GraphError>;
    fn close(&mut self) -> Result<(), GraphError>;
}

/// A slot-table in-memory storage manager. Slots are never reused within
/// a generation, mirroring a free-list-backed disk allocator closely
/// enough to exercise [`StorageManager::free`].
#[derive(Debug, Default)]
pub struct MemStorageManager {
    slots: Vec<Option<Bytes>>,
    roots: std::collections::HashMap<u8, Loc>,
    free_list: Vec<Loc>,
}

impl MemStorageManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageManager for MemStorageManager {
    fn insert(&mut self, value: Bytes) -> Result<Loc, GraphError> {
        if let Some(loc) = self.free_list.pop() {
            self.slots[loc as usize] = Some(value);
            Ok(loc)
        } else {
            self.slots.push(Some(value));
            Ok((self.slots.len() - 1) as Loc)
        }
    }

    fn fetch(&self, loc: Loc) -> Result<Bytes, GraphError> {
        self.slots
            .get(loc as usize)
            .and_then(|s| s.clone())
            .ok_or_else(|| GraphError::AccessComponent(format!("no such slot {loc}")))
    }

    fn update(&mut self, loc: Loc, value: Bytes) -> Result<(), GraphError> {
        let slot = self
            .slots
            .get_mut(loc as usize)
            .ok_or_else(|| GraphError::AccessComponent(format!("no such slot {loc}")))?;
        *slot = Some(value);
        Ok(())
    }

    fn free(&mut self, loc: Loc) -> Result<(), GraphError> {
        let slot = self
            .slots
            .get_mut(loc as usize)
            .ok_or_else(|| GraphError::AccessComponent(format!("no such slot {loc}")))?;
        *slot = None;
        self.free_list.push(loc);
        Ok(())
    }

    fn root(&self, slot: u8) -> Result<Option<Loc>, GraphError> {
        Ok(self.roots.get(&slot).copied())
    }

    fn set_root(&mut self, slot: u8, loc: Loc) -> Result<(), GraphError> {
        self.roots.insert(slot, loc);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), GraphError> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), GraphError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), GraphError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_fetch_update_free() {
        let mut mgr = MemStorageManager::new();
        let loc = mgr.insert(Bytes::from_static(b"hello")).unwrap();
        assert_eq!(mgr.fetch(loc).unwrap(), Bytes::from_static(b"hello"));
        mgr.update(loc, Bytes::from_static(b"world")).unwrap();
        assert_eq!(mgr.fetch(loc).unwrap(), Bytes::from_static(b"world"));
        mgr.free(loc).unwrap();
        assert!(mgr.fetch(loc).is_err());
    }

    #[test]
    fn roots_round_trip() {
        let mut mgr = MemStorageManager::new();
        assert_eq!(mgr.root(ROOT_PRIMARY).unwrap(), None);
        mgr.set_root(ROOT_PRIMARY, 7).unwrap();
        assert_eq!(mgr.root(ROOT_PRIMARY).unwrap(), Some(7));
    }

    #[test]
    fn freed_slot_is_reused() {
        let mut mgr = MemStorageManager::new();
        let a = mgr.insert(Bytes::from_static(b"a")).unwrap();
        mgr.free(a).unwrap();
        let b = mgr.insert(Bytes::from_static(b"b")).unwrap();
        assert_eq!(a, b);
    }
}
