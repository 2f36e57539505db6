//! The core entities: [`Node`], [`Edge`], [`Spec`], and the
//! [`TargetDescriptor`] stored in each node's adjacency map (spec §3.1,
//! §3.2).

use std::collections::BTreeMap;

use crate::error::GraphError;
use crate::value::Value;

/// A node: `(partition, kind, key)` is its primary identity (invariant
/// I2). `attrs` uses a `BTreeMap` so attribute iteration order (e.g. when
/// computing the `attrs` code set) is deterministic.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub key: String,
    pub kind: String,
    pub attrs: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(key: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: kind.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attrs.insert(name.into(), value);
        self
    }
}

/// The six endpoint attributes of one side of an edge, plus the
/// arbitrary attribute map. Endpoint fields are immutable after
/// creation (invariant I4).
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub key: String,
    pub kind: String,
    pub attrs: BTreeMap<String, Value>,

    pub end1_key: String,
    pub end1_kind: String,
    pub end1_role: String,
    pub end1_cascading: bool,
    pub end1_cascading_last: bool,

    pub end2_key: String,
    pub end2_kind: String,
    pub end2_role: String,
    pub end2_cascading: bool,
    pub end2_cascading_last: bool,
}

/// Reserved attribute names an edge's endpoint fields are smuggled under
/// when the edge is handed to the shared node-write routine (spec §4.2:
/// "using the node-write routine"). Never exposed to callers as ordinary
/// attributes — [`Edge::to_attr_map`]/[`Edge::from_attr_map`] strip them
/// back out.
pub const END1_KEY: &str = "end1key";
pub const END1_KIND: &str = "end1kind";
pub const END1_ROLE: &str = "end1role";
pub const END1_CASCADING: &str = "end1cascading";
pub const END1_CASCADING_LAST: &str = "end1cascadinglast";
pub const END2_KEY: &str = "end2key";
pub const END2_KIND: &str = "end2kind";
pub const END2_ROLE: &str = "end2role";
pub const END2_CASCADING: &str = "end2cascading";
pub const END2_CASCADING_LAST: &str = "end2cascadinglast";

impl Edge {
    /// Folds the endpoint fields into a plain attribute map the node-write
    /// routine can store like any other node.
    pub fn to_attr_map(&self) -> BTreeMap<String, Value> {
        let mut m = self.attrs.clone();
        m.insert(END1_KEY.into(), Value::Str(self.end1_key.clone()));
        m.insert(END1_KIND.into(), Value::Str(self.end1_kind.clone()));
        m.insert(END1_ROLE.into(), Value::Str(self.end1_role.clone()));
        m.insert(END1_CASCADING.into(), Value::Bool(self.end1_cascading));
        m.insert(END1_CASCADING_LAST.into(), Value::Bool(self.end1_cascading_last));
        m.insert(END2_KEY.into(), Value::Str(self.end2_key.clone()));
        m.insert(END2_KIND.into(), Value::Str(self.end2_kind.clone()));
        m.insert(END2_ROLE.into(), Value::Str(self.end2_role.clone()));
        m.insert(END2_CASCADING.into(), Value::Bool(self.end2_cascading));
        m.insert(END2_CASCADING_LAST.into(), Value::Bool(self.end2_cascading_last));
        m
    }

    /// Reconstructs an edge from a full attribute map previously produced
    /// by [`Edge::to_attr_map`] (or read back out of a container). Fails
    /// if any reserved endpoint attribute is missing or mistyped.
    pub fn from_attr_map(
        key: impl Into<String>,
        kind: impl Into<String>,
        mut map: BTreeMap<String, Value>,
    ) -> Result<Edge, GraphError> {
        let mut take_str = |field: &str| -> Result<String, GraphError> {
            match map.remove(field) {
                Some(Value::Str(s)) => Ok(s),
                _ => Err(GraphError::invalid_data(format!("edge is missing reserved attribute '{field}'"))),
            }
        };
        let end1_key = take_str(END1_KEY)?;
        let end1_kind = take_str(END1_KIND)?;
        let end1_role = take_str(END1_ROLE)?;
        let end2_key = take_str(END2_KEY)?;
        let end2_kind = take_str(END2_KIND)?;
        let end2_role = take_str(END2_ROLE)?;
        let mut take_bool = |field: &str| -> Result<bool, GraphError> {
            match map.remove(field) {
                Some(Value::Bool(b)) => Ok(b),
                _ => Err(GraphError::invalid_data(format!("edge is missing reserved attribute '{field}'"))),
            }
        };
        let end1_cascading = take_bool(END1_CASCADING)?;
        let end1_cascading_last = take_bool(END1_CASCADING_LAST)?;
        let end2_cascading = take_bool(END2_CASCADING)?;
        let end2_cascading_last = take_bool(END2_CASCADING_LAST)?;
        Ok(Edge {
            key: key.into(),
            kind: kind.into(),
            attrs: map,
            end1_key,
            end1_kind,
            end1_role,
            end1_cascading,
            end1_cascading_last,
            end2_key,
            end2_kind,
            end2_role,
            end2_cascading,
            end2_cascading_last,
        })
    }

    /// The 6 (or 10, counting both ends) fields that must not change
    /// across a re-store of an existing edge (invariant I4). We compare
    /// only keys/kinds/roles, matching the spec's wording ("must not
    /// change end1key, end1kind, end1role, end2key, end2kind, or
    /// end2role").
    pub fn endpoints_equal(&self, other: &Edge) -> bool {
        self.end1_key == other.end1_key
            && self.end1_kind == other.end1_kind
            && self.end1_role == other.end1_role
            && self.end2_key == other.end2_key
            && self.end2_kind == other.end2_kind
            && self.end2_role == other.end2_role
    }

    pub fn spec1(&self) -> Spec {
        Spec {
            role1: self.end1_role.clone(),
            kind: self.kind.clone(),
            role2: self.end2_role.clone(),
            endkind: self.end2_kind.clone(),
        }
    }

    pub fn spec2(&self) -> Spec {
        Spec {
            role1: self.end2_role.clone(),
            kind: self.kind.clone(),
            role2: self.end1_role.clone(),
            endkind: self.end1_kind.clone(),
        }
    }

    /// Swaps end1 and end2 in place, used by `Traverse` to stabilize
    /// "end1 = traversed-from node" for callers (spec §4.2 step 3).
    pub fn swap_ends(&mut self) {
        std::mem::swap(&mut self.end1_key, &mut self.end2_key);
        std::mem::swap(&mut self.end1_kind, &mut self.end2_kind);
        std::mem::swap(&mut self.end1_role, &mut self.end2_role);
        std::mem::swap(&mut self.end1_cascading, &mut self.end2_cascading);
        std::mem::swap(&mut self.end1_cascading_last, &mut self.end2_cascading_last);
    }
}

/// A 4-tuple `role1:kind:role2:endkind` identifying a typed edge from
/// the perspective of one endpoint (spec §3.1).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Spec {
    pub role1: String,
    pub kind: String,
    pub role2: String,
    pub endkind: String,
}

impl Spec {
    pub fn new(
        role1: impl Into<String>,
        kind: impl Into<String>,
        role2: impl Into<String>,
        endkind: impl Into<String>,
    ) -> Self {
        Self {
            role1: role1.into(),
            kind: kind.into(),
            role2: role2.into(),
            endkind: endkind.into(),
        }
    }

    /// A spec is "full" when all four components are non-empty.
    pub fn is_full(&self) -> bool {
        !self.role1.is_empty() && !self.kind.is_empty() && !self.role2.is_empty() && !self.endkind.is_empty()
    }

    /// Whether this (possibly partial) spec matches a full, concrete
    /// spec — empty components are wildcards, and the all-empty spec
    /// (`:::`) matches everything.
    pub fn matches(&self, concrete: &Spec) -> bool {
        (self.role1.is_empty() || self.role1 == concrete.role1)
            && (self.kind.is_empty() || self.kind == concrete.kind)
            && (self.role2.is_empty() || self.role2 == concrete.role2)
            && (self.endkind.is_empty() || self.endkind == concrete.endkind)
    }

    pub fn parse(s: &str) -> Result<Spec, GraphError> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 4 {
            return Err(GraphError::invalid_data(format!("malformed spec '{s}'")));
        }
        Ok(Spec::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

impl std::fmt::Display for Spec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}:{}", self.role1, self.kind, self.role2, self.endkind)
    }
}

/// What is stored under an `0x04 edge` adjacency entry for one
/// `(edgeKey, target)` pair (spec §3.2).
#[derive(Clone, Debug, PartialEq)]
pub struct TargetDescriptor {
    pub target_key: String,
    pub target_kind: String,
    pub cascade_to_target: bool,
    pub cascade_last_to_target: bool,
    pub cascade_from_target: bool,
    pub cascade_last_from_target: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_wildcard_matches_everything() {
        let wildcard = Spec::new("", "", "", "");
        let concrete = Spec::new("r1", "e", "r2", "k");
        assert!(wildcard.matches(&concrete));
    }

    #[test]
    fn spec_partial_filters_by_given_components() {
        let partial = Spec::new("r1", "", "", "");
        assert!(partial.matches(&Spec::new("r1", "e", "r2", "k")));
        assert!(!partial.matches(&Spec::new("other", "e", "r2", "k")));
    }

    #[test]
    fn spec_display_and_parse_round_trip() {
        let s = Spec::new("r1", "e", "r2", "k");
        let text = s.to_string();
        assert_eq!(text, "r1:e:r2:k");
        assert_eq!(Spec::parse(&text).unwrap(), s);
    }

    #[test]
    fn edge_attr_map_round_trip() {
        let edge = Edge {
            key: "e1".into(),
            kind: "e".into(),
            attrs: BTreeMap::from([("weight".to_string(), Value::Int(3))]),
            end1_key: "A".into(),
            end1_kind: "k".into(),
            end1_role: "r1".into(),
            end1_cascading: true,
            end1_cascading_last: false,
            end2_key: "B".into(),
            end2_kind: "k".into(),
            end2_role: "r2".into(),
            end2_cascading: false,
            end2_cascading_last: true,
        };
        let map = edge.to_attr_map();
        let back = Edge::from_attr_map("e1", "e", map).unwrap();
        assert_eq!(back, edge);
    }
}
