//! Broker configuration.
//!
//! Values come from [`BrokerConfig::default`], optionally overlaid by a JSON
//! file, and finally by command-line flags in the binary.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::domain::value_objects::PartitionStrategyKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    /// Fixed broker id; a UUID is generated when absent
    pub broker_id: Option<String>,

    pub partition_strategy: PartitionStrategyKind,

    /// Create unknown topics on first send instead of rejecting the send
    pub auto_create_topics: bool,

    /// Partition count for auto-created topics
    pub default_partitions: u32,

    pub default_replication_factor: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            broker_id: None,
            partition_strategy: PartitionStrategyKind::RoundRobin,
            auto_create_topics: false,
            default_partitions: 1,
            default_replication_factor: 1,
        }
    }
}

impl BrokerConfig {
    /// Load and validate a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BrokerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_partitions == 0 {
            return Err(ConfigError::Invalid(
                "default_partitions must be >= 1".to_string(),
            ));
        }
        if self.default_replication_factor == 0 {
            return Err(ConfigError::Invalid(
                "default_replication_factor must be >= 1".to_string(),
            ));
        }
        if matches!(self.broker_id.as_deref(), Some(id) if id.trim().is_empty()) {
            return Err(ConfigError::Invalid("broker_id cannot be blank".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BrokerConfig::default();
        assert_eq!(config.partition_strategy, PartitionStrategyKind::RoundRobin);
        assert!(!config.auto_create_topics);
        assert_eq!(config.default_partitions, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BrokerConfig::from_json(r#"{"partition_strategy": "key_based"}"#).unwrap();
        assert_eq!(config.partition_strategy, PartitionStrategyKind::KeyBased);
        assert_eq!(config.default_replication_factor, 1);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let err = BrokerConfig::from_json(r#"{"partition_strategy": "sticky"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_partitions_is_rejected() {
        let err = BrokerConfig::from_json(r#"{"default_partitions": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"broker_id": "b-1", "auto_create_topics": true, "default_partitions": 4}}"#
        )
        .unwrap();

        let config = BrokerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.broker_id.as_deref(), Some("b-1"));
        assert!(config.auto_create_topics);
        assert_eq!(config.default_partitions, 4);
    }

    #[test]
    fn test_missing_file() {
        let err = BrokerConfig::from_file("/nonexistent/minibroker.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
