//! Universal properties (round-trip, spec/adjacency parity, cascade,
//! merge semantics, deterministic ordering) exercised through the
//! public `graphhog` API.

use std::sync::Arc;

use graphhog::config::EngineConfig;
use graphhog::storage::MemGraphStorage;
use graphhog::value::Value;
use graphhog::{Edge, GraphManager, Node, Spec};

fn manager() -> Arc<GraphManager> {
    Arc::new(GraphManager::new(Arc::new(MemGraphStorage::new(false)), EngineConfig::default()).unwrap())
}

fn simple_edge(key: &str, kind: &str, end1: &str, end2: &str) -> Edge {
    Edge {
        key: key.into(),
        kind: kind.into(),
        attrs: Default::default(),
        end1_key: end1.into(),
        end1_kind: "k".into(),
        end1_role: "r1".into(),
        end1_cascading: false,
        end1_cascading_last: false,
        end2_key: end2.into(),
        end2_kind: "k".into(),
        end2_role: "r2".into(),
        end2_cascading: false,
        end2_cascading_last: false,
    }
}

#[test]
fn round_trip_node() {
    let mgr = manager();
    let node = Node::new("A", "user")
        .with_attr("name", Value::Str("alice".into()))
        .with_attr("age", Value::Int(30));
    mgr.store_node("p", node.clone()).unwrap();
    let fetched = mgr.fetch_node("p", "user", "A", None).unwrap().unwrap();
    assert_eq!(fetched, node);
}

#[test]
fn round_trip_edge() {
    let mgr = manager();
    mgr.store_node("p", Node::new("A", "k")).unwrap();
    mgr.store_node("p", Node::new("B", "k")).unwrap();
    let e = simple_edge("e1", "e", "A", "B");
    mgr.store_edge("p", e.clone()).unwrap();
    let fetched = mgr.fetch_edge("p", "e", "e1").unwrap().unwrap();
    assert_eq!(fetched, e);
}

#[test]
fn spec_adjacency_parity_holds_after_store_and_remove() {
    let mgr = manager();
    mgr.store_node("p", Node::new("A", "k")).unwrap();
    mgr.store_node("p", Node::new("B", "k")).unwrap();
    mgr.store_edge("p", simple_edge("e1", "e", "A", "B")).unwrap();

    assert_eq!(mgr.fetch_node_edge_specs("p", "A", "k").unwrap(), vec!["r1:e:r2:k".to_string()]);

    mgr.remove_edge("p", "e", "e1").unwrap();
    assert!(mgr.fetch_node_edge_specs("p", "A", "k").unwrap().is_empty());
}

#[test]
fn node_count_matches_number_of_stored_nodes_of_a_kind() {
    let mgr = manager();
    mgr.store_node("p", Node::new("A", "k")).unwrap();
    mgr.store_node("p", Node::new("B", "k")).unwrap();
    assert_eq!(mgr.node_count("k"), 2);
    mgr.remove_node("p", "k", "A").unwrap();
    assert_eq!(mgr.node_count("k"), 1);
}

#[test]
fn edge_count_matches_number_of_stored_edges_of_a_kind() {
    let mgr = manager();
    mgr.store_node("p", Node::new("A", "k")).unwrap();
    mgr.store_node("p", Node::new("B", "k")).unwrap();
    mgr.store_node("p", Node::new("C", "k")).unwrap();
    mgr.store_edge("p", simple_edge("e1", "e", "A", "B")).unwrap();
    mgr.store_edge("p", simple_edge("e2", "e", "A", "C")).unwrap();
    assert_eq!(mgr.edge_count("e"), 2);
    mgr.remove_edge("p", "e", "e1").unwrap();
    assert_eq!(mgr.edge_count("e"), 1);
}

#[test]
fn fetch_node_edge_specs_is_sorted() {
    let mgr = manager();
    mgr.store_node("p", Node::new("A", "k")).unwrap();
    mgr.store_node("p", Node::new("B", "k")).unwrap();
    mgr.store_node("p", Node::new("C", "k")).unwrap();

    mgr.store_edge("p", Edge { kind: "zz".into(), ..simple_edge("e1", "zz", "A", "B") }).unwrap();
    mgr.store_edge("p", Edge { kind: "aa".into(), ..simple_edge("e2", "aa", "A", "C") }).unwrap();

    let specs = mgr.fetch_node_edge_specs("p", "A", "k").unwrap();
    let mut sorted = specs.clone();
    sorted.sort();
    assert_eq!(specs, sorted);
}

#[test]
fn remove_node_cascades_to_incident_edges() {
    let mgr = manager();
    mgr.store_node("p", Node::new("A", "k")).unwrap();
    mgr.store_node("p", Node::new("B", "k")).unwrap();
    mgr.store_edge("p", simple_edge("e1", "e", "A", "B")).unwrap();

    mgr.remove_node("p", "k", "A").unwrap();
    assert!(mgr.fetch_edge("p", "e", "e1").unwrap().is_none());
    assert!(mgr.fetch_node("p", "k", "B").unwrap().is_some());
}

#[test]
fn remove_node_cascades_to_the_far_node_when_cascading_is_set() {
    let mgr = manager();
    mgr.store_node("p", Node::new("A", "k")).unwrap();
    mgr.store_node("p", Node::new("B", "k")).unwrap();
    let mut e = simple_edge("e1", "e", "A", "B");
    e.end1_cascading = true;
    mgr.store_edge("p", e).unwrap();

    mgr.remove_node("p", "k", "A").unwrap();
    assert!(mgr.fetch_node("p", "k", "B").unwrap().is_none());
}

#[test]
fn update_node_preserves_unspecified_attributes_and_overwrites_specified_ones() {
    let mgr = manager();
    mgr.store_node(
        "p",
        Node::new("A", "user")
            .with_attr("name", Value::Str("alice".into()))
            .with_attr("age", Value::Int(30)),
    )
    .unwrap();

    mgr.update_node("p", Node::new("A", "user").with_attr("age", Value::Int(31))).unwrap();

    let fetched = mgr.fetch_node("p", "user", "A", None).unwrap().unwrap();
    assert_eq!(fetched.attrs.get("name"), Some(&Value::Str("alice".into())));
    assert_eq!(fetched.attrs.get("age"), Some(&Value::Int(31)));
}

#[test]
fn traverse_multi_with_full_wildcard_matches_every_spec() {
    let mgr = manager();
    mgr.store_node("p", Node::new("A", "k")).unwrap();
    mgr.store_node("p", Node::new("B", "k")).unwrap();
    mgr.store_node("p", Node::new("C", "k")).unwrap();
    mgr.store_edge("p", simple_edge("e1", "e", "A", "B")).unwrap();
    mgr.store_edge(
        "p",
        Edge { kind: "other".into(), ..simple_edge("e2", "other", "A", "C") },
    )
    .unwrap();

    let wildcard = Spec::new("", "", "", "");
    let (nodes, edges) = mgr.traverse_multi("p", "A", "k", &wildcard, false).unwrap();
    assert_eq!(edges.len(), 2);
    assert_eq!(nodes.len(), 2);
}
