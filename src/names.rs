//! The Names Manager: a bidirectional dictionary mapping attribute,
//! role, and kind names to fixed-width opaque codes, backed by one
//! persistent map shared across both code spaces (spec §4.1).

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::GraphError;
use crate::storage::htree::HTree;

/// The two disjoint code spaces. Modeled as an enum (rather than a raw
/// width integer) so a caller cannot accidentally decode a role code in
/// the attribute space or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeSpace {
    /// 16-bit codes: edge roles, node/edge kind names.
    Role16,
    /// 32-bit codes: attribute names.
    Attr32,
}

impl CodeSpace {
    fn width(self) -> usize {
        match self {
            CodeSpace::Role16 => 2,
            CodeSpace::Attr32 => 4,
        }
    }

    fn tag(self) -> u8 {
        match self {
            CodeSpace::Role16 => b'R',
            CodeSpace::Attr32 => b'A',
        }
    }

    fn counter_key(self) -> &'static [u8] {
        match self {
            CodeSpace::Role16 => b"__names_counter_role16",
            CodeSpace::Attr32 => b"__names_counter_attr32",
        }
    }
}

#[derive(Debug)]
pub struct NamesManager {
    store: Arc<Mutex<dyn HTree>>,
}

impl NamesManager {
    pub fn new(store: Arc<Mutex<dyn HTree>>) -> Self {
        Self { store }
    }

    /// Returns the code for `name`, allocating and persisting a fresh one
    /// when `create` is true and `name` is unknown. Returns an empty
    /// vector ("unknown name") when `create` is false and `name` is
    /// unknown. Codes never change once assigned.
    pub fn encode(&self, space: CodeSpace, name: &str, create: bool) -> Result<Vec<u8>, GraphError> {
        let fwd_key = Self::forward_key(space, name);
        let mut store = self.store.lock();
        if let Some(code) = store.get(&fwd_key) {
            return Ok(code.to_vec());
        }
        if !create {
            return Ok(Vec::new());
        }
        let counter = Self::bump_counter(&mut *store, space)?;
        let code_bytes = counter.to_le_bytes()[..space.width()].to_vec();
        store.put(&fwd_key, Bytes::from(code_bytes.clone()));
        store.put(&Self::reverse_key(space, &code_bytes), Bytes::from(name.as_bytes().to_vec()));
        Ok(code_bytes)
    }

    /// Returns the original name for `code`, or an empty string if
    /// unknown.
    pub fn decode(&self, space: CodeSpace, code: &[u8]) -> String {
        let store = self.store.lock();
        store
            .get(&Self::reverse_key(space, code))
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default()
    }

    fn forward_key(space: CodeSpace, name: &str) -> Vec<u8> {
        let mut key = vec![space.tag(), b'F'];
        key.extend_from_slice(name.as_bytes());
        key
    }

    fn reverse_key(space: CodeSpace, code: &[u8]) -> Vec<u8> {
        let mut key = vec![space.tag(), b'B'];
        key.extend_from_slice(code);
        key
    }

    /// Flushes the underlying store. Never rolled back — code allocation
    /// is monotonic and a dropped transaction simply leaves a handful of
    /// unused codes behind, which is harmless (see DESIGN.md).
    pub(crate) fn flush(&self) -> Result<(), GraphError> {
        self.store.lock().flush()
    }

    fn bump_counter(store: &mut dyn HTree, space: CodeSpace) -> Result<u64, GraphError> {
        let key = space.counter_key();
        let current = store
            .get(key)
            .map(|b| {
                let mut arr = [0u8; 8];
                arr[..b.len().min(8)].copy_from_slice(&b[..b.len().min(8)]);
                u64::from_le_bytes(arr)
            })
            .unwrap_or(0);
        let next = current + 1;
        store.put(key, Bytes::from(next.to_le_bytes().to_vec()));
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::htree::MemHTree;

    fn names() -> NamesManager {
        NamesManager::new(Arc::new(Mutex::new(MemHTree::new())))
    }

    #[test]
    fn unknown_name_without_create_is_empty() {
        let n = names();
        assert!(n.encode(CodeSpace::Attr32, "foo", false).unwrap().is_empty());
    }

    #[test]
    fn create_allocates_and_persists() {
        let n = names();
        let code = n.encode(CodeSpace::Attr32, "foo", true).unwrap();
        assert_eq!(code.len(), 4);
        assert_eq!(n.encode(CodeSpace::Attr32, "foo", false).unwrap(), code);
        assert_eq!(n.decode(CodeSpace::Attr32, &code), "foo");
    }

    #[test]
    fn spaces_are_disjoint() {
        let n = names();
        let role_code = n.encode(CodeSpace::Role16, "x", true).unwrap();
        assert_eq!(role_code.len(), 2);
        assert_eq!(n.decode(CodeSpace::Attr32, &role_code), "");
    }

    #[test]
    fn counters_are_monotonic_and_codes_stable() {
        let n = names();
        let a = n.encode(CodeSpace::Role16, "a", true).unwrap();
        let b = n.encode(CodeSpace::Role16, "b", true).unwrap();
        assert_ne!(a, b);
        assert_eq!(n.encode(CodeSpace::Role16, "a", true).unwrap(), a);
    }
}
