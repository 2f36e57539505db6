//! Edge operations: `StoreEdge`, `FetchEdge`, `RemoveEdge`, `Traverse`,
//! `TraverseMulti`, `FetchNodeEdgeSpecs` (spec §4.2). Edges reuse the
//! node-write routine ([`super::node::write_item`]) under a synthesized
//! attribute map ([`Edge::to_attr_map`]).

use std::collections::BTreeMap;

use crate::config::validate_name;
use crate::error::{GraphError, RuleOutcome};
use crate::model::{Edge, Node, Spec, TargetDescriptor};
use crate::names::CodeSpace;
use crate::rules::{EventData, EventKind};

use super::node::{delete_item, write_item};
use super::spec::{decode_spec, encode_spec};
use super::GraphManager;

impl GraphManager {
    pub fn store_edge(&self, partition: &str, edge: Edge) -> Result<(), GraphError> {
        let _writer = self.acquire_writer();
        match self.store_edge_locked(partition, edge) {
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

    pub(crate) fn store_edge_locked(&self, partition: &str, edge: Edge) -> Result<(), GraphError> {
        validate_name("partition", partition)?;
        validate_name("kind", &edge.kind)?;
        validate_name("kind", &edge.end1_kind)?;
        validate_name("kind", &edge.end2_kind)?;
        validate_name("role", &edge.end1_role)?;
        validate_name("role", &edge.end2_role)?;
        if edge.key.is_empty() || edge.end1_key.is_empty() || edge.end2_key.is_empty() {
            return Err(GraphError::invalid_data("edge and endpoint keys must not be empty"));
        }

        // I3: both endpoints must already exist.
        let end1_container = self
            .node_container(partition, &edge.end1_kind, false)?
            .filter(|c| c.exists(&edge.end1_key));
        let end2_container = self
            .node_container(partition, &edge.end2_kind, false)?
            .filter(|c| c.exists(&edge.end2_key));
        let (end1_container, end2_container) = match (end1_container, end2_container) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(GraphError::invalid_data(format!("Can't find edge endpoint: {}", edge.key))),
        };

        let pre_data = EventData::Edge { partition: partition.to_string(), edge: edge.clone() };
        if self.events().publish(self, EventKind::EdgeStore, &pre_data)? == RuleOutcome::Handled {
            return Ok(());
        }

        self.declare_kind_locked(partition, &edge.kind, true)?;
        let edge_container = self.edge_container(partition, &edge.kind, true)?.expect("just declared");

        let new_attr_map = edge.to_attr_map();
        let (outcome, index_err) = write_item(&edge_container, self.names(), &edge.key, &new_attr_map, false)?;

        if outcome.existed {
            let old_edge = Edge::from_attr_map(edge.key.clone(), edge.kind.clone(), outcome.old_attrs.clone())?;
            if !old_edge.endpoints_equal(&edge) {
                // I4: the caller's write already landed in `edge_container`;
                // returning an error here unwinds through `store_edge`'s
                // wrapper, which rolls back every container touched since
                // the last flush — including this one — restoring the
                // prior endpoint data without a manual rewrite.
                return Err(GraphError::invalid_data(format!(
                    "Cannot update endpoints or spec of existing edge: {}",
                    edge.key
                )));
            }
            let data = EventData::Edge { partition: partition.to_string(), edge: edge.clone() };
            self.events().publish(self, EventKind::EdgeUpdated, &data)?;
            return match index_err {
                Some(e) => Err(e),
                None => Ok(()),
            };
        }

        // Insert path: mirrored specs and adjacency at both endpoints.
        let spec1 = edge.spec1();
        let spec2 = edge.spec2();
        let code1 = encode_spec(self.names(), &spec1, true)?.expect("create=true always yields a code");
        let code2 = encode_spec(self.names(), &spec2, true)?.expect("create=true always yields a code");

        upsert_adjacency(
            &end1_container,
            &edge.end1_key,
            &code1,
            &edge.key,
            TargetDescriptor {
                target_key: edge.end2_key.clone(),
                target_kind: edge.end2_kind.clone(),
                cascade_to_target: edge.end1_cascading,
                cascade_last_to_target: edge.end1_cascading_last,
                cascade_from_target: edge.end2_cascading,
                cascade_last_from_target: edge.end2_cascading_last,
            },
        );
        upsert_adjacency(
            &end2_container,
            &edge.end2_key,
            &code2,
            &edge.key,
            TargetDescriptor {
                target_key: edge.end1_key.clone(),
                target_kind: edge.end1_kind.clone(),
                cascade_to_target: edge.end2_cascading,
                cascade_last_to_target: edge.end2_cascading_last,
                cascade_from_target: edge.end1_cascading,
                cascade_last_from_target: edge.end1_cascading_last,
            },
        );

        self.directory().incr_edge_count(&edge.kind, 1)?;

        log::debug!("stored edge {} ({} -> {})", edge.key, edge.end1_key, edge.end2_key);
        let data = EventData::Edge { partition: partition.to_string(), edge: edge.clone() };
        self.events().publish(self, EventKind::EdgeCreated, &data)?;

        match index_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn fetch_edge(&self, partition: &str, kind: &str, key: &str) -> Result<Option<Edge>, GraphError> {
        let _reader = self.acquire_reader();
        self.fetch_edge_locked(partition, kind, key)
    }

    pub(crate) fn fetch_edge_locked(&self, partition: &str, kind: &str, key: &str) -> Result<Option<Edge>, GraphError> {
        let container = match self.edge_container(partition, kind, false)? {
            Some(c) => c,
            None => return Ok(None),
        };
        read_full_edge(self, &container, key, kind)
    }

    pub fn remove_edge(&self, partition: &str, kind: &str, key: &str) -> Result<Option<Edge>, GraphError> {
        let _writer = self.acquire_writer();
        match self.remove_edge_locked(partition, kind, key) {
            Ok(e) => {
                self.flush_all();
                Ok(e)
            }
            Err(e) => {
                let _ = self.rollback_all();
                Err(e)
            }
        }
    }

    pub(crate) fn remove_edge_locked(&self, partition: &str, kind: &str, key: &str) -> Result<Option<Edge>, GraphError> {
        let edge_container = match self.edge_container(partition, kind, false)? {
            Some(c) => c,
            None => return Ok(None),
        };
        if !edge_container.exists(key) {
            return Ok(None);
        }

        let pre_data = EventData::EdgeKey {
            partition: partition.to_string(),
            kind: kind.to_string(),
            key: key.to_string(),
        };
        if self.events().publish(self, EventKind::EdgeDelete, &pre_data)? == RuleOutcome::Handled {
            return Ok(None);
        }

        let (removed_attrs, index_err) = delete_item(&edge_container, self.names(), key)?;
        let removed_attrs = match removed_attrs {
            Some(a) => a,
            None => return Ok(None),
        };
        let edge = Edge::from_attr_map(key.to_string(), kind.to_string(), removed_attrs)?;

        for (end_key, end_kind, spec) in [
            (&edge.end1_key, &edge.end1_kind, edge.spec1()),
            (&edge.end2_key, &edge.end2_kind, edge.spec2()),
        ] {
            if let Some(end_container) = self.node_container(partition, end_kind, false)? {
                if let Some(code) = encode_spec(self.names(), &spec, false)? {
                    let mut map = end_container.get_edge_map(end_key, &code);
                    map.remove(key);
                    end_container.put_edge_map(end_key, &code, &map);
                    if map.is_empty() {
                        let mut specs = end_container.get_specs(end_key);
                        specs.remove(&code.to_vec());
                        end_container.put_specs(end_key, &specs);
                    }
                }
            }
        }

        self.directory().incr_edge_count(kind, -1)?;

        let data = EventData::Edge { partition: partition.to_string(), edge: edge.clone() };
        self.events().publish(self, EventKind::EdgeDeleted, &data)?;

        match index_err {
            Some(e) => Err(e),
            None => Ok(Some(edge)),
        }
    }

    /// `Traverse`: `spec` must be fully specified (spec §4.2).
    pub fn traverse(
        &self,
        partition: &str,
        key: &str,
        kind: &str,
        spec: &Spec,
        all_data: bool,
    ) -> Result<(Vec<Node>, Vec<Edge>), GraphError> {
        let _reader = self.acquire_reader();
        self.traverse_locked(partition, key, kind, spec, all_data)
    }

    pub(crate) fn traverse_locked(
        &self,
        partition: &str,
        key: &str,
        kind: &str,
        spec: &Spec,
        all_data: bool,
    ) -> Result<(Vec<Node>, Vec<Edge>), GraphError> {
        if !spec.is_full() {
            return Err(GraphError::invalid_data("Traverse requires a fully specified spec"));
        }
        let container = match self.node_container(partition, kind, false)? {
            Some(c) => c,
            None => return Ok((Vec::new(), Vec::new())),
        };
        let code = match encode_spec(self.names(), spec, false)? {
            Some(c) => c,
            None => return Ok((Vec::new(), Vec::new())),
        };

        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        for (edge_key, target) in container.get_edge_map(key, &code) {
            if all_data {
                let edge_container = self.edge_container(partition, &spec.kind, false)?;
                let full = match edge_container.and_then(|c| read_full_edge(self, &c, &edge_key, &spec.kind).transpose()) {
                    Some(Ok(e)) => e,
                    Some(Err(err)) => return Err(err),
                    None => continue,
                };
                let mut edge = full;
                if edge.end2_key == key && edge.end2_kind == kind {
                    edge.swap_ends();
                }
                if let Some(node) = self.fetch_node_locked(partition, &target.target_kind, &target.target_key, None)? {
                    nodes.push(node);
                }
                edges.push(edge);
            } else {
                edges.push(Edge {
                    key: edge_key,
                    kind: spec.kind.clone(),
                    attrs: BTreeMap::new(),
                    end1_key: key.to_string(),
                    end1_kind: kind.to_string(),
                    end1_role: spec.role1.clone(),
                    end1_cascading: target.cascade_to_target,
                    end1_cascading_last: target.cascade_last_to_target,
                    end2_key: target.target_key.clone(),
                    end2_kind: target.target_kind.clone(),
                    end2_role: spec.role2.clone(),
                    end2_cascading: target.cascade_from_target,
                    end2_cascading_last: target.cascade_last_from_target,
                });
                nodes.push(super::synthetic_target_node(&target.target_key, &target.target_kind));
            }
        }
        Ok((nodes, edges))
    }

    /// `TraverseMulti`: `spec` may carry wildcard (empty) components;
    /// the all-empty spec matches every spec the node participates in.
    pub fn traverse_multi(
        &self,
        partition: &str,
        key: &str,
        kind: &str,
        spec: &Spec,
        all_data: bool,
    ) -> Result<(Vec<Node>, Vec<Edge>), GraphError> {
        let _reader = self.acquire_reader();
        self.traverse_multi_locked(partition, key, kind, spec, all_data)
    }

    pub(crate) fn traverse_multi_locked(
        &self,
        partition: &str,
        key: &str,
        kind: &str,
        spec: &Spec,
        all_data: bool,
    ) -> Result<(Vec<Node>, Vec<Edge>), GraphError> {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        for text in self.fetch_node_edge_specs_locked(partition, key, kind)? {
            let concrete = Spec::parse(&text)?;
            if !spec.matches(&concrete) {
                continue;
            }
            let (n, e) = self.traverse_locked(partition, key, kind, &concrete, all_data)?;
            nodes.extend(n);
            edges.extend(e);
        }
        Ok((nodes, edges))
    }

    pub fn fetch_node_edge_specs(&self, partition: &str, key: &str, kind: &str) -> Result<Vec<String>, GraphError> {
        let _reader = self.acquire_reader();
        self.fetch_node_edge_specs_locked(partition, key, kind)
    }

    pub(crate) fn fetch_node_edge_specs_locked(
        &self,
        partition: &str,
        key: &str,
        kind: &str,
    ) -> Result<Vec<String>, GraphError> {
        let container = match self.node_container(partition, kind, false)? {
            Some(c) => c,
            None => return Ok(Vec::new()),
        };
        let mut specs: Vec<String> = container
            .get_specs(key)
            .iter()
            .map(|code| decode_spec(self.names(), code).to_string())
            .collect();
        specs.sort();
        Ok(specs)
    }
}

fn upsert_adjacency(
    container: &std::sync::Arc<crate::container::Container>,
    key: &str,
    spec_code: &[u8],
    edge_key: &str,
    target: TargetDescriptor,
) {
    let mut specs = container.get_specs(key);
    specs.insert(spec_code.to_vec());
    container.put_specs(key, &specs);
    let mut map = container.get_edge_map(key, spec_code);
    map.insert(edge_key.to_string(), target);
    container.put_edge_map(key, spec_code, &map);
}

fn read_full_edge(
    manager: &GraphManager,
    container: &crate::container::Container,
    key: &str,
    kind: &str,
) -> Result<Option<Edge>, GraphError> {
    if !container.exists(key) {
        return Ok(None);
    }
    let codes = container.get_attr_codes(key);
    let mut attrs = BTreeMap::new();
    for code in &codes {
        let name = manager.names().decode(CodeSpace::Attr32, code);
        if name.is_empty() {
            continue;
        }
        if let Some(v) = container.get_attr_value(key, code)? {
            attrs.insert(name, v);
        }
    }
    Ok(Some(Edge::from_attr_map(key.to_string(), kind.to_string(), attrs)?))
}
