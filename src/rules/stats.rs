//! The built-in `UpdateNodeStats` rule (spec §4.4): maintains the main
//! directory's per-kind attribute and spec sets. Additionally decrements
//! those sets when a kind's last instance is removed (SPEC_FULL.md
//! §4.4 supplement), so long-lived graphs don't accumulate attribute
//! names for kinds that no longer have any members.

use crate::error::{GraphError, RuleOutcome};
use crate::graph::GraphManager;

use super::{EventData, EventKind, Rule};

pub struct UpdateNodeStats;

const HANDLES: &[EventKind] = &[
    EventKind::NodeCreated,
    EventKind::NodeUpdated,
    EventKind::NodeDeleted,
    EventKind::EdgeCreated,
    EventKind::EdgeUpdated,
    EventKind::EdgeDeleted,
];

impl Rule for UpdateNodeStats {
    fn name(&self) -> &str {
        "UpdateNodeStats"
    }

    fn handles(&self) -> &'static [EventKind] {
        HANDLES
    }

    fn handle(&self, manager: &GraphManager, kind: EventKind, data: &EventData) -> Result<RuleOutcome, GraphError> {
        match (kind, data) {
            (EventKind::NodeCreated, EventData::Node { node, .. })
            | (EventKind::NodeUpdated, EventData::Node { node, .. }) => {
                for name in node.attrs.keys() {
                    manager.directory().add_node_attr(&node.kind, name)?;
                }
            }
            (EventKind::NodeDeleted, EventData::NodeDeleted { node, .. }) => {
                if manager.node_count(&node.kind) == 0 {
                    for name in node.attrs.keys() {
                        manager.directory().remove_node_attr(&node.kind, name)?;
                    }
                }
            }
            (EventKind::EdgeCreated, EventData::Edge { edge, .. })
            | (EventKind::EdgeUpdated, EventData::Edge { edge, .. }) => {
                for name in edge.attrs.keys() {
                    manager.directory().add_edge_attr(&edge.kind, name)?;
                }
                manager.directory().add_node_spec(&edge.end1_kind, &edge.spec1().to_string())?;
                manager.directory().add_node_spec(&edge.end2_kind, &edge.spec2().to_string())?;
            }
            (EventKind::EdgeDeleted, EventData::Edge { edge, .. }) => {
                if manager.edge_count(&edge.kind) == 0 {
                    for name in edge.attrs.keys() {
                        manager.directory().remove_edge_attr(&edge.kind, name)?;
                    }
                }
            }
            _ => {}
        }
        Ok(RuleOutcome::Continue)
    }
}
