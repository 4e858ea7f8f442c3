//! Reconciler Configuration
//!
//! Configuration is a plain serde struct. Every field has a default, so a
//! partial JSON document (or none at all) is valid.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What to do when a change notification arrives while a pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReentrancyPolicy {
    /// Enqueue the component and re-render it after the running pass commits.
    #[default]
    Queue,

    /// Fail with [`ReconcileError::Reentrant`](crate::ReconcileError::Reentrant).
    Reject,
}

/// Tunables for a [`Reconciler`](crate::Reconciler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Handling of re-entrant change notifications.
    pub reentrancy: ReentrancyPolicy,

    /// Upper bound on queued re-renders drained in one flush.
    pub max_rerenders_per_flush: usize,

    /// Apply `visible = true` to every new host widget before its own props.
    pub default_visible: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reentrancy: ReentrancyPolicy::Queue,
            max_rerenders_per_flush: 1024,
            default_visible: true,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config =
            Config::from_json(r#"{ "reentrancy": "reject", "default_visible": false }"#).unwrap();
        assert_eq!(config.reentrancy, ReentrancyPolicy::Reject);
        assert!(!config.default_visible);
        assert_eq!(config.max_rerenders_per_flush, 1024);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(Config::from_json(r#"{ "reentrancy": "sometimes" }"#).is_err());
    }
}
