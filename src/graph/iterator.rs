//! `NodeKeyIterator`: a lazy, restartable cursor over the node keys of
//! one (partition, kind) container (spec §4.5). Snapshotting the key
//! list at construction keeps `Next` non-blocking and avoids
//! re-acquiring the manager's reader lock per call.

use std::sync::Arc;

use crate::container::Container;
use crate::error::GraphError;

pub struct NodeKeyIterator {
    keys: Vec<String>,
    pos: usize,
    last_error: Option<GraphError>,
}

impl NodeKeyIterator {
    pub(crate) fn new(container: Option<Arc<Container>>) -> Self {
        let keys = container.map(|c| c.all_keys()).unwrap_or_default();
        Self { keys, pos: 0, last_error: None }
    }

    /// Whether another key is available. Never blocks.
    pub fn has_next(&self) -> bool {
        self.pos < self.keys.len()
    }

    pub fn next(&mut self) -> Option<String> {
        let key = self.keys.get(self.pos).cloned();
        if key.is_some() {
            self.pos += 1;
        }
        key
    }

    pub fn restart(&mut self) {
        self.pos = 0;
    }

    /// Surfaces the last error encountered by this cursor, if any. The
    /// in-memory reference implementation never fails mid-iteration
    /// (the key list is a point-in-time snapshot), so this is always
    /// `None` today; kept for parity with a disk-backed cursor that can.
    pub fn last_error(&self) -> Option<&GraphError> {
        self.last_error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::htree::MemHTree;
    use crate::storage::index::MemIndexManager;
    use parking_lot::Mutex;

    #[test]
    fn iterates_in_sorted_order_and_restarts() {
        let container = Arc::new(Container::new(
            Arc::new(Mutex::new(MemHTree::new())),
            Arc::new(Mutex::new(MemIndexManager::new(false))),
        ));
        container.put_attr_codes("b", &Default::default());
        container.put_attr_codes("a", &Default::default());

        let mut it = NodeKeyIterator::new(Some(container));
        assert!(it.has_next());
        assert_eq!(it.next(), Some("a".to_string()));
        assert_eq!(it.next(), Some("b".to_string()));
        assert!(!it.has_next());
        assert_eq!(it.next(), None);

        it.restart();
        assert_eq!(it.next(), Some("a".to_string()));
    }

    #[test]
    fn absent_container_yields_empty_iterator() {
        let mut it = NodeKeyIterator::new(None);
        assert!(!it.has_next());
        assert_eq!(it.next(), None);
    }
}
