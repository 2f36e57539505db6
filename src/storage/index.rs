//! The full-text index manager contract (spec §1, out of scope as an
//! external collaborator) plus [`MemIndexManager`], an in-memory
//! reference implementation good enough to exercise `LookupWord`,
//! `LookupPhrase`, `LookupValue`, and `Count` (spec §4.5).
//!
//! Index update failures are reported as [`GraphError::IndexError`] and
//! never roll back the primary write (invariant I8 is best-effort).

use std::collections::{BTreeSet, HashMap};

use crate::error::GraphError;
use crate::value::Value;

pub trait IndexManager: Send + Sync + std::fmt::Debug {
    /// Indexes every word/value of `attr` for `item_key`, replacing
    /// whatever was previously indexed for that (item, attr) pair.
    fn index_attr(&mut self, item_key: &str, attr: &str, value: &Value) -> Result<(), GraphError>;
    /// Removes every indexed entry for `item_key`, across all attributes.
    fn remove_item(&mut self, item_key: &str) -> Result<(), GraphError>;
    fn lookup_word(&self, attr: &str, word: &str) -> Vec<String>;
    fn lookup_phrase(&self, attr: &str, phrase: &str) -> Vec<String>;
    fn lookup_value(&self, attr: &str, exact: &str) -> Vec<String>;
    fn count(&self, attr: &str, word: &str) -> usize;
}

#[derive(Debug)]
pub struct MemIndexManager {
    case_sensitive: bool,
    words: HashMap<(String, String), BTreeSet<String>>,
    exact: HashMap<(String, String), BTreeSet<String>>,
    phrases: HashMap<(String, String), String>,
    // item_key -> [(attr, normalized_word)] and [(attr, normalized_exact)],
    // so `remove_item` can undo exactly what `index_attr` recorded.
    item_words: HashMap<String, Vec<(String, String)>>,
    item_exact: HashMap<String, Vec<(String, String)>>,
}

impl MemIndexManager {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            words: HashMap::new(),
            exact: HashMap::new(),
            phrases: HashMap::new(),
            item_words: HashMap::new(),
            item_exact: HashMap::new(),
        }
    }

    fn norm(&self, s: &str) -> String {
        if self.case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    }
}

impl IndexManager for MemIndexManager {
    fn index_attr(&mut self, item_key: &str, attr: &str, value: &Value) -> Result<(), GraphError> {
        // Re-indexing an attribute clears its previous entries first.
        self.remove_attr(item_key, attr);

        let mut words_for_item = Vec::new();
        for word in value.index_words() {
            let norm = self.norm(&word);
            self.words
                .entry((attr.to_string(), norm.clone()))
                .or_default()
                .insert(item_key.to_string());
            words_for_item.push((attr.to_string(), norm));
        }
        self.item_words
            .entry(item_key.to_string())
            .or_default()
            .extend(words_for_item);

        let exact_norm = self.norm(&value.index_exact());
        self.exact
            .entry((attr.to_string(), exact_norm.clone()))
            .or_default()
            .insert(item_key.to_string());
        self.item_exact
            .entry(item_key.to_string())
            .or_default()
            .push((attr.to_string(), exact_norm));

        let phrase = self.norm(&value.index_words().join(" "));
        self.phrases.insert((item_key.to_string(), attr.to_string()), phrase);

        Ok(())
    }

    fn remove_item(&mut self, item_key: &str) -> Result<(), GraphError> {
        if let Some(entries) = self.item_words.remove(item_key) {
            for (attr, word) in entries {
                if let Some(set) = self.words.get_mut(&(attr, word)) {
                    set.remove(item_key);
                }
            }
        }
        if let Some(entries) = self.item_exact.remove(item_key) {
            for (attr, exact) in entries {
                if let Some(set) = self.exact.get_mut(&(attr, exact)) {
                    set.remove(item_key);
                }
            }
        }
        self.phrases.retain(|(key, _), _| key != item_key);
        Ok(())
    }

    fn lookup_word(&self, attr: &str, word: &str) -> Vec<String> {
        let norm = self.norm(word);
        self.words
            .get(&(attr.to_string(), norm))
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn lookup_phrase(&self, attr: &str, phrase: &str) -> Vec<String> {
        let norm = self.norm(phrase);
        let mut out: Vec<String> = self
            .phrases
            .iter()
            .filter(|((_, a), text)| a == attr && text.contains(&norm))
            .map(|((key, _), _)| key.clone())
            .collect();
        out.sort();
        out
    }

    fn lookup_value(&self, attr: &str, exact: &str) -> Vec<String> {
        let norm = self.norm(exact);
        self.exact
            .get(&(attr.to_string(), norm))
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn count(&self, attr: &str, word: &str) -> usize {
        self.lookup_word(attr, word).len()
    }
}

impl MemIndexManager {
    fn remove_attr(&mut self, item_key: &str, attr: &str) {
        if let Some(entries) = self.item_words.get_mut(item_key) {
            entries.retain(|(a, word)| {
                if a == attr {
                    if let Some(set) = self.words.get_mut(&(a.clone(), word.clone())) {
                        set.remove(item_key);
                    }
                    false
                } else {
                    true
                }
            });
        }
        if let Some(entries) = self.item_exact.get_mut(item_key) {
            entries.retain(|(a, exact)| {
                if a == attr {
                    if let Some(set) = self.exact.get_mut(&(a.clone(), exact.clone())) {
                        set.remove(item_key);
                    }
                    false
                } else {
                    true
                }
            });
        }
        self.phrases.remove(&(item_key.to_string(), attr.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_lookup_is_case_insensitive_by_default() {
        let mut idx = MemIndexManager::new(false);
        idx.index_attr("n1", "label", &Value::Str("Hello World".into())).unwrap();
        assert_eq!(idx.lookup_word("label", "hello"), vec!["n1".to_string()]);
        assert_eq!(idx.lookup_word("label", "HELLO"), vec!["n1".to_string()]);
    }

    #[test]
    fn remove_item_clears_all_attrs() {
        let mut idx = MemIndexManager::new(false);
        idx.index_attr("n1", "label", &Value::Str("hello".into())).unwrap();
        idx.index_attr("n1", "desc", &Value::Str("world".into())).unwrap();
        idx.remove_item("n1").unwrap();
        assert!(idx.lookup_word("label", "hello").is_empty());
        assert!(idx.lookup_word("desc", "world").is_empty());
    }

    #[test]
    fn phrase_lookup_matches_substring() {
        let mut idx = MemIndexManager::new(false);
        idx.index_attr("n1", "label", &Value::Str("the quick brown fox".into())).unwrap();
        assert_eq!(idx.lookup_phrase("label", "quick brown"), vec!["n1".to_string()]);
        assert!(idx.lookup_phrase("label", "slow brown").is_empty());
    }

    #[test]
    fn exact_value_lookup() {
        let mut idx = MemIndexManager::new(false);
        idx.index_attr("n1", "count", &Value::Int(42)).unwrap();
        assert_eq!(idx.lookup_value("count", "42"), vec!["n1".to_string()]);
    }
}
