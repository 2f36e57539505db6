//! Encoding specs (`role1:kind:role2:endkind`) to and from the 8-byte
//! code used as the `0x03 specs`/`0x04 edge` key suffix (spec §3.2):
//! four 16-bit role/kind codes from the [`NamesManager`]'s `Role16`
//! space.

use crate::error::GraphError;
use crate::model::Spec;
use crate::names::{CodeSpace, NamesManager};

/// Encodes `spec`'s four components, allocating fresh codes when
/// `create` is true. Returns `None` (not an error) when `create` is
/// false and any component is unknown — the caller's adjacency lookup
/// is then vacuously empty (spec §4.2 "Traverse with full spec", step
/// 1).
pub fn encode_spec(names: &NamesManager, spec: &Spec, create: bool) -> Result<Option<[u8; 8]>, GraphError> {
    let role1 = names.encode(CodeSpace::Role16, &spec.role1, create)?;
    let kind = names.encode(CodeSpace::Role16, &spec.kind, create)?;
    let role2 = names.encode(CodeSpace::Role16, &spec.role2, create)?;
    let endkind = names.encode(CodeSpace::Role16, &spec.endkind, create)?;
    if !create && (role1.is_empty() || kind.is_empty() || role2.is_empty() || endkind.is_empty()) {
        return Ok(None);
    }
    let mut code = [0u8; 8];
    code[0..2].copy_from_slice(&role1);
    code[2..4].copy_from_slice(&kind);
    code[4..6].copy_from_slice(&role2);
    code[6..8].copy_from_slice(&endkind);
    Ok(Some(code))
}

pub fn decode_spec(names: &NamesManager, code: &[u8]) -> Spec {
    Spec {
        role1: names.decode(CodeSpace::Role16, &code[0..2]),
        kind: names.decode(CodeSpace::Role16, &code[2..4]),
        role2: names.decode(CodeSpace::Role16, &code[4..6]),
        endkind: names.decode(CodeSpace::Role16, &code[6..8]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::htree::MemHTree;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn round_trips_through_names_manager() {
        let names = NamesManager::new(Arc::new(Mutex::new(MemHTree::new())));
        let spec = Spec::new("r1", "e", "r2", "k");
        let code = encode_spec(&names, &spec, true).unwrap().unwrap();
        assert_eq!(decode_spec(&names, &code), spec);
    }

    #[test]
    fn unknown_component_without_create_is_none() {
        let names = NamesManager::new(Arc::new(Mutex::new(MemHTree::new())));
        let spec = Spec::new("r1", "e", "r2", "k");
        assert!(encode_spec(&names, &spec, false).unwrap().is_none());
    }
}
