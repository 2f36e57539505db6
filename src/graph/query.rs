//! `IndexQuery`: the handle `NodeIndexQuery`/`EdgeIndexQuery` return,
//! delegating word/phrase/exact-value lookups straight to the
//! container's [`IndexManager`] (spec §4.5).

use std::sync::Arc;

use parking_lot::Mutex;

use crate::storage::index::IndexManager;

pub struct IndexQuery {
    index: Arc<Mutex<dyn IndexManager>>,
}

impl IndexQuery {
    pub(crate) fn new(index: Arc<Mutex<dyn IndexManager>>) -> Self {
        Self { index }
    }

    pub fn lookup_word(&self, attr: &str, word: &str) -> Vec<String> {
        self.index.lock().lookup_word(attr, word)
    }

    pub fn lookup_phrase(&self, attr: &str, phrase: &str) -> Vec<String> {
        self.index.lock().lookup_phrase(attr, phrase)
    }

    pub fn lookup_value(&self, attr: &str, exact: &str) -> Vec<String> {
        self.index.lock().lookup_value(attr, exact)
    }

    pub fn count(&self, attr: &str, word: &str) -> usize {
        self.index.lock().count(attr, word)
    }
}
