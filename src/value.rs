//! The self-describing attribute-value encoding.
//!
//! Replaces the source system's generic interface-typed attribute maps
//! (see spec design notes) with a tagged union of the encodable scalar
//! types, round-tripped through [`bincode`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// A single attribute value. Nested maps use `BTreeMap` (not `HashMap`) so
/// that two values built from the same data always encode to the same
/// bytes, which keeps [`encode`] deterministic — required for the export
/// fixpoint property (P-equivalent of spec scenario 6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Flattens this value into the tokens the full-text index should
    /// record for it: strings contribute their whitespace-split words,
    /// lists and maps recurse, scalars other than strings contribute
    /// nothing (they are only reachable through `LookupValue`, not
    /// `LookupWord`).
    pub fn index_words(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_words(&mut out);
        out
    }

    fn collect_words(&self, out: &mut Vec<String>) {
        match self {
            Value::Str(s) => out.extend(s.split_whitespace().map(|w| w.to_string())),
            Value::List(items) => items.iter().for_each(|v| v.collect_words(out)),
            Value::Map(m) => m.values().for_each(|v| v.collect_words(out)),
            Value::Bool(_) | Value::Int(_) | Value::Bytes(_) => {}
        }
    }

    /// Renders this value as a single string for exact-value indexing
    /// (`LookupValue`). Scalars render directly; compound values render
    /// through their debug form, which is stable for our purposes since
    /// we only ever compare it to itself.
    pub fn index_exact(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Bytes(b) => hex_encode(b),
            Value::List(_) | Value::Map(_) => format!("{self:?}"),
        }
    }

    /// Lossless JSON rendering used by import/export. Non-JSON-encodable
    /// values (none exist in this tagged union, but kept for future
    /// extension per spec §6.4) fall back to `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::json!(i),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::String(hex_encode(b)),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(m) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in m {
                    obj.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(obj)
            }
        }
    }

    pub fn from_json(j: &serde_json::Value) -> Value {
        match j {
            serde_json::Value::Null => Value::Str(String::new()),
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                Value::Int(n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64))
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(obj) => {
                let mut m = BTreeMap::new();
                for (k, v) in obj {
                    m.insert(k.clone(), Value::from_json(v));
                }
                Value::Map(m)
            }
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Encodes a value into the binary form stored under a `0x02 attr` key.
pub fn encode(value: &Value) -> Result<Vec<u8>, GraphError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| GraphError::Writing(format!("encoding attribute value: {e}")))
}

/// Decodes a value previously produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<Value, GraphError> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(v, _)| v)
        .map_err(|e| GraphError::Reading(format!("decoding attribute value: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_scalars() {
        for v in [
            Value::Bool(true),
            Value::Int(-42),
            Value::Str("hello world".into()),
            Value::Bytes(vec![1, 2, 3]),
        ] {
            let bytes = encode(&v).unwrap();
            assert_eq!(decode(&bytes).unwrap(), v);
        }
    }

    #[test]
    fn round_trips_nested() {
        let mut m = BTreeMap::new();
        m.insert("a".to_string(), Value::Int(1));
        m.insert("b".to_string(), Value::List(vec![Value::Str("x".into())]));
        let v = Value::Map(m);
        let bytes = encode(&v).unwrap();
        assert_eq!(decode(&bytes).unwrap(), v);
    }

    #[test]
    fn index_words_recurses() {
        let v = Value::List(vec![Value::Str("foo bar".into()), Value::Str("baz".into())]);
        assert_eq!(v.index_words(), vec!["foo", "bar", "baz"]);
    }
}
