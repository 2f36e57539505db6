//! JSON import/export of one partition (spec §6.4): `{ "nodes": [...],
//! "edges": [...] }`, each entry a flat object of the item's fields plus
//! its attributes. Export is sorted by `(kind, key)` for determinism;
//! import is one transactional insert.

use std::sync::Arc;

use serde_json::{json, Map, Value as Json};

use crate::error::GraphError;
use crate::graph::GraphManager;
use crate::model::{Edge, Node};
use crate::txn::Transaction;
use crate::value::Value;

/// Streams every node and edge kind declared for `partition` into the
/// `{ "nodes": [...], "edges": [...] }` shape, sorted by `(kind, key)`.
pub fn export_partition(manager: &GraphManager, partition: &str) -> Result<Json, GraphError> {
    let mut nodes = Vec::new();
    for kind in manager.node_kinds() {
        let mut iter = manager.node_key_iterator(partition, &kind)?;
        while let Some(key) = iter.next() {
            if let Some(node) = manager.fetch_node(partition, &kind, &key, None)? {
                nodes.push((kind.clone(), key, node_to_json(&node)));
            }
        }
    }
    nodes.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

    let mut edges = Vec::new();
    for kind in manager.edge_kinds() {
        let mut iter = manager.edge_key_iterator(partition, &kind)?;
        while let Some(key) = iter.next() {
            if let Some(edge) = manager.fetch_edge(partition, &kind, &key)? {
                edges.push((kind.clone(), key, edge_to_json(&edge)));
            }
        }
    }
    edges.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

    Ok(json!({
        "nodes": nodes.into_iter().map(|(_, _, v)| v).collect::<Vec<_>>(),
        "edges": edges.into_iter().map(|(_, _, v)| v).collect::<Vec<_>>(),
    }))
}

/// Imports a document previously produced by [`export_partition`] into
/// `partition` as a single transaction: every node is stored before any
/// edge is, matching `Commit`'s own nodes-before-edges ordering, so an
/// edge can always reference a node imported earlier in the same file.
pub fn import_partition(manager: Arc<GraphManager>, partition: &str, doc: &Json) -> Result<(), GraphError> {
    let mut txn = Transaction::new(manager);
    for node_json in doc.get("nodes").and_then(Json::as_array).into_iter().flatten() {
        txn.store_node(partition, node_from_json(node_json)?);
    }
    for edge_json in doc.get("edges").and_then(Json::as_array).into_iter().flatten() {
        txn.store_edge(partition, edge_from_json(edge_json)?);
    }
    txn.commit()
}

fn node_to_json(node: &Node) -> Json {
    let mut obj = Map::new();
    obj.insert("key".into(), Json::String(node.key.clone()));
    obj.insert("kind".into(), Json::String(node.kind.clone()));
    let mut attrs = Map::new();
    for (name, value) in &node.attrs {
        attrs.insert(name.clone(), value.to_json());
    }
    obj.insert("attrs".into(), Json::Object(attrs));
    Json::Object(obj)
}

fn node_from_json(j: &Json) -> Result<Node, GraphError> {
    let key = field_str(j, "key")?;
    let kind = field_str(j, "kind")?;
    let mut node = Node::new(key, kind);
    if let Some(attrs) = j.get("attrs").and_then(Json::as_object) {
        for (name, value) in attrs {
            node.attrs.insert(name.clone(), Value::from_json(value));
        }
    }
    Ok(node)
}

fn edge_to_json(edge: &Edge) -> Json {
    let mut obj = Map::new();
    obj.insert("key".into(), Json::String(edge.key.clone()));
    obj.insert("kind".into(), Json::String(edge.kind.clone()));
    obj.insert("end1_key".into(), Json::String(edge.end1_key.clone()));
    obj.insert("end1_kind".into(), Json::String(edge.end1_kind.clone()));
    obj.insert("end1_role".into(), Json::String(edge.end1_role.clone()));
    obj.insert("end1_cascading".into(), Json::Bool(edge.end1_cascading));
    obj.insert("end1_cascading_last".into(), Json::Bool(edge.end1_cascading_last));
    obj.insert("end2_key".into(), Json::String(edge.end2_key.clone()));
    obj.insert("end2_kind".into(), Json::String(edge.end2_kind.clone()));
    obj.insert("end2_role".into(), Json::String(edge.end2_role.clone()));
    obj.insert("end2_cascading".into(), Json::Bool(edge.end2_cascading));
    obj.insert("end2_cascading_last".into(), Json::Bool(edge.end2_cascading_last));
    let mut attrs = Map::new();
    for (name, value) in &edge.attrs {
        attrs.insert(name.clone(), value.to_json());
    }
    obj.insert("attrs".into(), Json::Object(attrs));
    Json::Object(obj)
}

fn edge_from_json(j: &Json) -> Result<Edge, GraphError> {
    let mut edge = Edge {
        key: field_str(j, "key")?,
        kind: field_str(j, "kind")?,
        attrs: Default::default(),
        end1_key: field_str(j, "end1_key")?,
        end1_kind: field_str(j, "end1_kind")?,
        end1_role: field_str(j, "end1_role")?,
        end1_cascading: field_bool(j, "end1_cascading"),
        end1_cascading_last: field_bool(j, "end1_cascading_last"),
        end2_key: field_str(j, "end2_key")?,
        end2_kind: field_str(j, "end2_kind")?,
        end2_role: field_str(j, "end2_role")?,
        end2_cascading: field_bool(j, "end2_cascading"),
        end2_cascading_last: field_bool(j, "end2_cascading_last"),
    };
    if let Some(attrs) = j.get("attrs").and_then(Json::as_object) {
        for (name, value) in attrs {
            edge.attrs.insert(name.clone(), Value::from_json(value));
        }
    }
    Ok(edge)
}

fn field_str(j: &Json, field: &str) -> Result<String, GraphError> {
    j.get(field)
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| GraphError::invalid_data(format!("import entry is missing string field '{field}'")))
}

fn field_bool(j: &Json, field: &str) -> bool {
    j.get(field).and_then(Json::as_bool).unwrap_or(false)
}
