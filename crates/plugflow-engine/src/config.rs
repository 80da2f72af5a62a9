//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tunables of a [`DepGraph`](crate::DepGraph) session.
///
/// Hosts usually embed this in their own configuration file; every field has
/// a default, so a partial or empty JSON object is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum nesting of node computes before a pull fails with
    /// `RecursionLimit`. Plain input hops and facade forwards do not count.
    /// Default: 512.
    pub max_pull_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_pull_depth: 512,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn overrides_depth() {
        let config = EngineConfig::from_json(r#"{"max_pull_depth": 16}"#).unwrap();
        assert_eq!(config.max_pull_depth, 16);
    }

    #[test]
    fn rejects_bad_types() {
        assert!(EngineConfig::from_json(r#"{"max_pull_depth": "deep"}"#).is_err());
    }
}
