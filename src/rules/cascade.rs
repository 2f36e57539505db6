//! The built-in `DeleteNodeEdges` rule (spec §4.4): on `NodeDeleted`,
//! removes every incident edge and, for cascading ends, the far node.

use crate::error::{GraphError, RuleOutcome};
use crate::graph::GraphManager;
use crate::model::Spec;

use super::{EventData, EventKind, Rule};

pub struct DeleteNodeEdges;

const HANDLES: &[EventKind] = &[EventKind::NodeDeleted];

impl Rule for DeleteNodeEdges {
    fn name(&self) -> &str {
        "DeleteNodeEdges"
    }

    fn handles(&self) -> &'static [EventKind] {
        HANDLES
    }

    fn handle(&self, manager: &GraphManager, _kind: EventKind, data: &EventData) -> Result<RuleOutcome, GraphError> {
        let (partition, node) = match data {
            EventData::NodeDeleted { partition, node } => (partition, node),
            _ => return Ok(RuleOutcome::Continue),
        };

        let wildcard = Spec::new("", "", "", "");
        // `allData = true` so every edge comes back normalized with
        // `end1` = the node we just deleted (spec §4.2 step 3), letting
        // us read "this end"'s cascade flags off `end1_*` uniformly.
        let (_, edges) = manager.traverse_multi_locked(partition, &node.key, &node.kind, &wildcard, true)?;

        for edge in edges {
            let far_key = edge.end2_key.clone();
            let far_kind = edge.end2_kind.clone();
            let far_perspective_spec = edge.spec2();
            let this_cascading = edge.end1_cascading;
            let this_cascading_last = edge.end1_cascading_last;

            manager.remove_edge_locked(partition, &edge.kind, &edge.key)?;

            if !this_cascading {
                continue;
            }
            if this_cascading_last {
                let remaining = manager.fetch_node_edge_specs_locked(partition, &far_key, &far_kind)?;
                if remaining.contains(&far_perspective_spec.to_string()) {
                    continue;
                }
            }
            // Per spec §9 Open Question (ii): removing an already-absent
            // far node (e.g. reached twice via two specs) is a no-op,
            // not an error.
            manager.remove_node_locked(partition, &far_kind, &far_key)?;
        }

        Ok(RuleOutcome::Continue)
    }
}
