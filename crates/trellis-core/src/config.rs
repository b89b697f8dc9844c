//! Runtime configuration for the dispatch manager.
//!
//! Loaded from a JSON file or from `TRELLIS_*` environment variables; every
//! field has a default so an empty object is a valid config.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How re-dispatch treats nodes not touched by an override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverridePolicy {
    /// Any override marks every node dirty. A structural diff cannot prove
    /// that the rest of the graph is independent of the edited node.
    #[default]
    MarkAll,

    /// Only the overridden nodes and their transitive descendants are dirty.
    Downstream,
}

impl std::str::FromStr for OverridePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mark_all" => Ok(OverridePolicy::MarkAll),
            "downstream" => Ok(OverridePolicy::Downstream),
            other => Err(ConfigError::InvalidValue {
                key: "override_policy",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Dispatch manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrellisConfig {
    pub override_policy: OverridePolicy,

    /// `tracing_subscriber::EnvFilter` directive used by binaries.
    pub log_filter: String,
}

impl Default for TrellisConfig {
    fn default() -> Self {
        Self {
            override_policy: OverridePolicy::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl TrellisConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Defaults overridden by `TRELLIS_OVERRIDE_POLICY` and `TRELLIS_LOG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(policy) = lookup("TRELLIS_OVERRIDE_POLICY") {
            self.override_policy = policy.parse()?;
        }
        if let Some(filter) = lookup("TRELLIS_LOG") {
            self.log_filter = filter;
        }
        Ok(self)
    }
}
