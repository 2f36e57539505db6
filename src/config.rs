//! Compile-time naming rules and the process-wide index configuration.

use crate::error::GraphError;

/// Validates that `name` is non-empty and `[A-Za-z0-9_]+` (invariant I1).
/// Used for partition names, kind names, and role names.
pub fn validate_name(field: &str, name: &str) -> Result<(), GraphError> {
    if name.is_empty() {
        return Err(GraphError::invalid_data(format!("{field} must not be empty")));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(GraphError::invalid_data(format!(
            "{field} '{name}' must be alphanumeric (plus underscore)"
        )));
    }
    Ok(())
}

/// Engine-wide configuration. Passed explicitly into [`crate::graph::GraphManager::new`]
/// rather than kept as a mutable global, so independent engines (e.g. in
/// tests) never share state through hidden process-wide flags.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Whether the full-text index treats words as case-sensitive.
    /// Default: `false` (case-insensitive), per spec.
    pub index_case_sensitive: bool,
    /// After how many buffered operations a [`crate::txn::RollingTransaction`]
    /// self-commits.
    pub rolling_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_case_sensitive: false,
            rolling_threshold: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty() {
        assert!(validate_name("kind", "").is_err());
    }

    #[test]
    fn rejects_non_alphanumeric() {
        assert!(validate_name("kind", "a-b").is_err());
        assert!(validate_name("kind", "a b").is_err());
        assert!(validate_name("kind", "a:b").is_err());
    }

    #[test]
    fn accepts_alphanumeric_and_underscore() {
        assert!(validate_name("kind", "Song_1").is_ok());
        assert!(validate_name("kind", "k").is_ok());
    }
}
