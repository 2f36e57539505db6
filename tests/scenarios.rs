//! End-to-end coverage of the concrete scenarios the graph manager and
//! transaction engine are expected to handle, driven entirely through
//! the public `graphhog` API.

use std::sync::Arc;

use graphhog::config::EngineConfig;
use graphhog::io::{export_partition, import_partition};
use graphhog::storage::MemGraphStorage;
use graphhog::txn::{RollingTransaction, Transaction};
use graphhog::value::Value;
use graphhog::{Edge, ErrorKind, GraphManager, Node, Spec};

fn manager() -> Arc<GraphManager> {
    Arc::new(GraphManager::new(Arc::new(MemGraphStorage::new(false)), EngineConfig::default()).unwrap())
}

fn edge(
    key: &str,
    kind: &str,
    end1_key: &str,
    end1_kind: &str,
    end1_role: &str,
    end1_cascading: bool,
    end1_cascading_last: bool,
    end2_key: &str,
    end2_kind: &str,
    end2_role: &str,
) -> Edge {
    Edge {
        key: key.into(),
        kind: kind.into(),
        attrs: Default::default(),
        end1_key: end1_key.into(),
        end1_kind: end1_kind.into(),
        end1_role: end1_role.into(),
        end1_cascading,
        end1_cascading_last,
        end2_key: end2_key.into(),
        end2_kind: end2_kind.into(),
        end2_role: end2_role.into(),
        end2_cascading: false,
        end2_cascading_last: false,
    }
}

#[test]
fn three_node_three_edge_fan() {
    let mgr = manager();
    mgr.store_node("p", Node::new("A", "k")).unwrap();
    mgr.store_node("p", Node::new("B", "k")).unwrap();
    mgr.store_node("p", Node::new("C", "k")).unwrap();

    mgr.store_edge("p", edge("e1", "e", "A", "k", "r1", false, false, "B", "k", "r2")).unwrap();
    mgr.store_edge("p", edge("e2", "e", "A", "k", "r1", false, false, "C", "k", "r2")).unwrap();
    mgr.store_edge("p", edge("e3", "e", "A", "k", "r1", false, false, "C", "k", "r2")).unwrap();

    assert_eq!(mgr.edge_count("e"), 3);
    assert_eq!(mgr.fetch_node_edge_specs("p", "A", "k").unwrap(), vec!["r1:e:r2:k".to_string()]);

    let spec = Spec::new("r1", "e", "r2", "k");
    let (nodes, edges) = mgr.traverse("p", "A", "k", &spec, false).unwrap();
    assert_eq!(edges.len(), 3);
    let mut keys: Vec<&str> = nodes.iter().map(|n| n.key.as_str()).collect();
    keys.sort();
    assert_eq!(keys, vec!["B", "C", "C"]);
}

#[test]
fn endpoint_change_is_rejected_and_original_endpoint_survives() {
    let mgr = manager();
    mgr.store_node("p", Node::new("A", "k")).unwrap();
    mgr.store_node("p", Node::new("B", "k")).unwrap();
    mgr.store_node("p", Node::new("C", "k")).unwrap();
    mgr.store_edge("p", edge("abc", "e", "A", "k", "r1", false, false, "B", "k", "r2")).unwrap();

    let err = mgr
        .store_edge("p", edge("abc", "e", "C", "k", "r1", false, false, "B", "k", "r2"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
    assert_eq!(err.to_string(), "GraphError: InvalidData (Cannot update endpoints or spec of existing edge: abc)");

    let still_there = mgr.fetch_edge("p", "e", "abc").unwrap().unwrap();
    assert_eq!(still_there.end1_key, "A");
}

#[test]
fn cascading_last_removes_the_far_node_only_once_all_edges_of_the_spec_are_gone() {
    let mgr = manager();
    mgr.store_node("p", Node::new("Song1", "song")).unwrap();
    mgr.store_node("p", Node::new("Song2", "song")).unwrap();
    mgr.store_node("p", Node::new("Artist1", "artist")).unwrap();

    mgr.store_edge("p", edge("e1", "by", "Song1", "song", "performs", true, true, "Artist1", "artist", "performed_by"))
        .unwrap();
    mgr.store_edge("p", edge("e2", "by", "Song2", "song", "performs", true, true, "Artist1", "artist", "performed_by"))
        .unwrap();

    mgr.remove_node("p", "song", "Song1").unwrap();
    assert!(mgr.fetch_node("p", "artist", "Artist1", None).unwrap().is_some());

    mgr.remove_node("p", "song", "Song2").unwrap();
    assert!(mgr.fetch_node("p", "artist", "Artist1", None).unwrap().is_none());
}

#[test]
fn transaction_rolls_back_whole_batch_on_a_missing_endpoint() {
    let mgr = manager();
    let mut txn = Transaction::new(mgr.clone());
    txn.store_node("p", Node::new("A", "k"));
    txn.store_edge("p", edge("e1", "e", "A", "k", "r1", false, false, "missing", "k", "r2"));

    let err = txn.commit().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
    assert_eq!(mgr.node_count("k"), 0);
    assert!(mgr.fetch_node("p", "k", "A", None).unwrap().is_none());
}

#[tokio::test]
async fn rolling_transaction_self_commits_at_the_threshold() {
    let mgr = manager();
    let rolling = RollingTransaction::new(mgr.clone(), 3);

    rolling.store_node("p", Node::new("n1", "user"));
    rolling.store_node("p", Node::new("n2", "user"));
    assert!(rolling.pending_count() >= 2);

    rolling.store_node("p", Node::new("n3", "user"));
    // The third store should have tripped the threshold and dispatched a
    // background commit. Poll until it lands on its own, without ever
    // calling `commit`, to prove `pending_count` self-drains.
    for _ in 0..1000 {
        if rolling.pending_count() == 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(rolling.pending_count(), 0);
    assert_eq!(mgr.node_count("user"), 3);

    rolling.commit().await.unwrap();
    assert_eq!(rolling.pending_count(), 0);
    assert_eq!(mgr.node_count("user"), 3);
}

#[test]
fn import_of_an_export_reproduces_the_same_export() {
    let mgr = manager();
    mgr.store_node("p", Node::new("A", "user").with_attr("name", Value::Str("alice".into()))).unwrap();
    mgr.store_node("p", Node::new("B", "user").with_attr("name", Value::Str("bob".into()))).unwrap();
    mgr.store_edge("p", edge("e1", "follows", "A", "user", "follower", false, false, "B", "user", "followed"))
        .unwrap();

    let exported = export_partition(&mgr, "p").unwrap();

    let mgr2 = manager();
    import_partition(mgr2.clone(), "p", &exported).unwrap();
    let reexported = export_partition(&mgr2, "p").unwrap();

    assert_eq!(exported, reexported);
}
