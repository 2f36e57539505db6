//! The shared node-write routine (spec §4.2 "Node write") and the
//! `GraphManager` node operations built on it. Edges reuse
//! [`write_item`]/[`delete_item`] directly — they are stored as nodes of
//! a different kind (spec §3.2).

use std::collections::{BTreeMap, BTreeSet};

use crate::config::validate_name;
use crate::container::Container;
use crate::error::{GraphError, RuleOutcome};
use crate::model::Node;
use crate::names::{CodeSpace, NamesManager};
use crate::rules::EventData;
use crate::value::Value;

use super::GraphManager;

pub struct WriteOutcome {
    pub existed: bool,
    /// The complete attribute map as it was immediately before this
    /// write (empty if the item did not previously exist).
    pub old_attrs: BTreeMap<String, Value>,
}

/// Writes `new_attrs` under `key`, either as a full replace
/// (`merge = false`, `StoreNode`/`StoreEdge`) or a partial merge
/// (`merge = true`, `UpdateNode`). Reindexes the item's current
/// attributes afterward; an index failure is returned alongside a
/// successful outcome rather than as the primary error, per I8.
pub fn write_item(
    container: &Container,
    names: &NamesManager,
    key: &str,
    new_attrs: &BTreeMap<String, Value>,
    merge: bool,
) -> Result<(WriteOutcome, Option<GraphError>), GraphError> {
    let existed = container.exists(key);
    let prev_codes = container.get_attr_codes(key);

    let mut old_attrs = BTreeMap::new();
    if existed {
        for code in &prev_codes {
            if let Some(v) = container.get_attr_value(key, code)? {
                let name = names.decode(CodeSpace::Attr32, code);
                if !name.is_empty() {
                    old_attrs.insert(name, v);
                }
            }
        }
    }

    let mut new_codes = BTreeSet::new();
    for (name, value) in new_attrs {
        let code = names.encode(CodeSpace::Attr32, name, true)?;
        container.put_attr_value(key, &code, value)?;
        new_codes.insert(code);
    }

    let final_codes = if merge {
        prev_codes.union(&new_codes).cloned().collect::<BTreeSet<_>>()
    } else {
        for code in prev_codes.difference(&new_codes) {
            container.delete_attr_value(key, code)?;
        }
        new_codes.clone()
    };

    if final_codes != prev_codes {
        container.put_attr_codes(key, &final_codes);
    }

    // The item's full current state: for a merge, retained old entries
    // plus whatever the new write overrides; for a replace, exactly the
    // new entries (old-only entries were deleted above).
    let mut current = if merge { old_attrs.clone() } else { BTreeMap::new() };
    for (k, v) in new_attrs {
        current.insert(k.clone(), v.clone());
    }

    let index_err = reindex(container, key, &current).err();

    Ok((WriteOutcome { existed, old_attrs }, index_err))
}

/// Removes every `attr` value, the `attrs` entry itself, and the item's
/// index entries. Returns `None` if the item was already absent.
pub fn delete_item(
    container: &Container,
    names: &NamesManager,
    key: &str,
) -> Result<(Option<BTreeMap<String, Value>>, Option<GraphError>), GraphError> {
    if !container.exists(key) {
        return Ok((None, None));
    }
    let codes = container.get_attr_codes(key);
    let mut removed = BTreeMap::new();
    for code in &codes {
        if let Some(v) = container.delete_attr_value(key, code)? {
            let name = names.decode(CodeSpace::Attr32, code);
            if !name.is_empty() {
                removed.insert(name, v);
            }
        }
    }
    container.delete_attr_codes(key);
    let index_err = container.index.lock().remove_item(key).err();
    Ok((Some(removed), index_err))
}

fn reindex(container: &Container, key: &str, attrs: &BTreeMap<String, Value>) -> Result<(), GraphError> {
    let mut index = container.index.lock();
    index.remove_item(key)?;
    for (name, value) in attrs {
        index.index_attr(key, name, value)?;
    }
    Ok(())
}

impl GraphManager {
    pub fn store_node(&self, partition: &str, node: Node) -> Result<(), GraphError> {
        let _writer = self.acquire_writer();
        match self.store_node_locked(partition, node, false) {
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

    /// `UpdateNode`: partial merge. Kind mismatch against an existing
    /// stored node cannot occur structurally here — `(partition, kind)`
    /// already selects which container is addressed, so there is no
    /// "different kind, same key" collision to reject (see DESIGN.md,
    /// Open Question i).
    pub fn update_node(&self, partition: &str, node: Node) -> Result<(), GraphError> {
        let _writer = self.acquire_writer();
        match self.store_node_locked(partition, node, true) {
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

    pub(crate) fn store_node_locked(&self, partition: &str, node: Node, merge: bool) -> Result<(), GraphError> {
        validate_name("partition", partition)?;
        validate_name("kind", &node.kind)?;
        if node.key.is_empty() {
            return Err(GraphError::invalid_data("node key must not be empty"));
        }

        let pre_kind = if merge {
            crate::rules::EventKind::NodeUpdate
        } else {
            crate::rules::EventKind::NodeStore
        };
        let pre_data = EventData::Node { partition: partition.to_string(), node: node.clone() };
        if self.events().publish(self, pre_kind, &pre_data)? == RuleOutcome::Handled {
            return Ok(());
        }

        self.declare_kind_locked(partition, &node.kind, false)?;
        let container = self
            .node_container(partition, &node.kind, true)?
            .expect("just declared");

        let (outcome, index_err) = write_item(&container, self.names(), &node.key, &node.attrs, merge)?;
        self.directory().incr_node_count(&node.kind, if outcome.existed { 0 } else { 1 })?;

        let event_kind = if outcome.existed {
            crate::rules::EventKind::NodeUpdated
        } else {
            crate::rules::EventKind::NodeCreated
        };
        let data = EventData::Node { partition: partition.to_string(), node: node.clone() };
        self.events().publish(self, event_kind, &data)?;

        match index_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn fetch_node(
        &self,
        partition: &str,
        kind: &str,
        key: &str,
        attrs_filter: Option<&[String]>,
    ) -> Result<Option<Node>, GraphError> {
        let _reader = self.acquire_reader();
        self.fetch_node_locked(partition, kind, key, attrs_filter)
    }

    pub(crate) fn fetch_node_locked(
        &self,
        partition: &str,
        kind: &str,
        key: &str,
        attrs_filter: Option<&[String]>,
    ) -> Result<Option<Node>, GraphError> {
        let container = match self.node_container(partition, kind, false)? {
            Some(c) => c,
            None => return Ok(None),
        };
        if !container.exists(key) {
            return Ok(None);
        }
        let codes = container.get_attr_codes(key);
        let mut attrs = BTreeMap::new();
        for code in &codes {
            let name = self.names().decode(CodeSpace::Attr32, code);
            if name.is_empty() {
                continue;
            }
            if let Some(filter) = attrs_filter {
                if !filter.iter().any(|f| f == &name) {
                    continue;
                }
            }
            if let Some(v) = container.get_attr_value(key, code)? {
                attrs.insert(name, v);
            }
        }
        Ok(Some(Node { key: key.to_string(), kind: kind.to_string(), attrs }))
    }

    pub fn remove_node(&self, partition: &str, kind: &str, key: &str) -> Result<Option<Node>, GraphError> {
        let _writer = self.acquire_writer();
        match self.remove_node_locked(partition, kind, key) {
            Ok(n) => {
                self.flush_all();
                Ok(n)
            }
            Err(e) => {
                let _ = self.rollback_all();
                Err(e)
            }
        }
    }

    pub(crate) fn remove_node_locked(&self, partition: &str, kind: &str, key: &str) -> Result<Option<Node>, GraphError> {
        let container = match self.node_container(partition, kind, false)? {
            Some(c) => c,
            None => return Ok(None),
        };
        if !container.exists(key) {
            return Ok(None);
        }

        let pre_data = EventData::NodeKey {
            partition: partition.to_string(),
            kind: kind.to_string(),
            key: key.to_string(),
        };
        if self.events().publish(self, crate::rules::EventKind::NodeDelete, &pre_data)? == RuleOutcome::Handled {
            return Ok(None);
        }

        let (removed, index_err) = delete_item(&container, self.names(), key)?;
        let removed = match removed {
            Some(a) => a,
            None => return Ok(None),
        };
        self.directory().incr_node_count(kind, -1)?;

        let node = Node { key: key.to_string(), kind: kind.to_string(), attrs: removed };

        log::debug!("removed node {}/{}/{} — dispatching cascade", partition, kind, key);
        let data = EventData::NodeDeleted { partition: partition.to_string(), node: node.clone() };
        self.events().publish(self, crate::rules::EventKind::NodeDeleted, &data)?;

        match index_err {
            Some(e) => Err(e),
            None => Ok(Some(node)),
        }
    }
}
