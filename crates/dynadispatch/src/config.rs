//! Dispatcher configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::tagger::{ListTagging, TagOptions};

/// Nesting limit the storage service enforces on documents.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Configuration for a [`Dispatcher`](crate::Dispatcher)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// List element tagging mode
    pub list_tagging: ListTagging,
    /// Maximum document nesting depth, unlimited when `None`
    pub max_depth: Option<usize>,
    /// Table used when an event names none
    pub default_table: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            list_tagging: ListTagging::Legacy,
            max_depth: Some(DEFAULT_MAX_DEPTH),
            default_table: None,
        }
    }
}

/// Errors loading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file couldn't be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The file isn't valid configuration JSON
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl DispatchConfig {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Tagging options derived from this configuration.
    pub fn tag_options(&self) -> TagOptions {
        TagOptions {
            list_tagging: self.list_tagging,
            max_depth: self.max_depth,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DispatchConfig::default();

        assert_eq!(config.list_tagging, ListTagging::Legacy);
        assert_eq!(config.max_depth, Some(32));
        assert!(config.default_table.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: DispatchConfig = serde_json::from_str(r#"{"list_tagging": "recursive"}"#).unwrap();

        assert_eq!(config.list_tagging, ListTagging::Recursive);
        assert_eq!(config.max_depth, Some(DEFAULT_MAX_DEPTH));
    }

    #[test]
    fn test_unlimited_depth() {
        let config: DispatchConfig = serde_json::from_str(r#"{"max_depth": null}"#).unwrap();
        assert_eq!(config.tag_options().max_depth, None);
    }

    #[test]
    fn test_from_missing_file() {
        let err = DispatchConfig::from_file("/nonexistent/dynadispatch.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
