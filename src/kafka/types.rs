//! Types exchanged with the cluster.

use serde::{Deserialize, Serialize};

/// Where a topic config value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigSource {
    /// Set explicitly on the topic.
    DynamicTopicConfig,
    /// Dynamic broker logger config.
    DynamicBrokerLoggerConfig,
    /// Dynamic per-broker config.
    DynamicBrokerConfig,
    /// Dynamic cluster-wide broker default.
    DynamicDefaultBrokerConfig,
    /// Broker properties file.
    StaticBrokerConfig,
    /// Built-in default.
    DefaultConfig,
    /// Anything else.
    #[serde(other)]
    Unknown,
}

/// A topic config entry as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Config key.
    pub name: String,
    /// Current value; sensitive entries have none.
    #[serde(default)]
    pub value: Option<String>,
    /// Origin of the value.
    pub source: ConfigSource,
}

impl ConfigEntry {
    /// Creates an entry set directly on the topic.
    #[must_use]
    pub fn dynamic(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            source: ConfigSource::DynamicTopicConfig,
        }
    }

    /// Returns true if the value was set on the topic itself.
    #[must_use]
    pub fn is_dynamic_topic_config(&self) -> bool {
        self.source == ConfigSource::DynamicTopicConfig
    }
}

/// One key of a topic reconfiguration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChange {
    /// Config key.
    pub key: String,
    /// New value, or `None` to delete the override.
    pub value: Option<String>,
}

impl ConfigChange {
    /// Sets a key.
    #[must_use]
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Deletes a key.
    #[must_use]
    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_source_tolerated() {
        let entry: ConfigEntry = serde_json::from_value(serde_json::json!({
            "name": "retention.ms",
            "value": "1000",
            "source": "SOMETHING_NEW"
        }))
        .unwrap();
        assert_eq!(entry.source, ConfigSource::Unknown);
        assert!(!entry.is_dynamic_topic_config());

        let entry: ConfigEntry = serde_json::from_value(serde_json::json!({
            "name": "retention.ms",
            "value": "1000",
            "source": "DYNAMIC_TOPIC_CONFIG"
        }))
        .unwrap();
        assert!(entry.is_dynamic_topic_config());
    }
}
