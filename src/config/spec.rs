//! Declared state types.
//!
//! This module defines the structs that map to the desired state YAML file.
//! They are the raw, unresolved form: replication may be missing, principals
//! may be missing and custom ACL fields are still plain strings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::state::{AclDetails, AclOperation, AclPermission, PatternType, ResourceType, TopicDetails};

/// The root of a desired state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DesiredStateFile {
    /// Global settings.
    #[serde(default)]
    pub settings: Settings,
    /// Topics keyed by name.
    #[serde(default)]
    pub topics: BTreeMap<String, TopicDetails>,
    /// Services keyed by name.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceDetails>,
    /// Users keyed by name.
    #[serde(default)]
    pub users: BTreeMap<String, UserDetails>,
    /// Extra ACLs per service, keyed by service name then ACL name.
    #[serde(default, rename = "customServiceAcls")]
    pub custom_service_acls: BTreeMap<String, BTreeMap<String, CustomAclDetails>>,
    /// Extra ACLs per user, keyed by user name then ACL name.
    #[serde(default, rename = "customUserAcls")]
    pub custom_user_acls: BTreeMap<String, BTreeMap<String, CustomAclDetails>>,
}

/// Global settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Identity provisioning through Confluent Cloud.
    #[serde(default)]
    pub ccloud: CloudSettings,
    /// Topic defaults and prefix filters.
    #[serde(default)]
    pub topics: TopicSettings,
    /// Service-wide ACL options.
    #[serde(default)]
    pub services: ServiceSettings,
    /// Auxiliary files merged into this one.
    #[serde(default)]
    pub files: FileSettings,
}

/// Identity provisioning settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CloudSettings {
    /// Resolve principals from the Confluent Cloud account directory.
    #[serde(default)]
    pub enabled: bool,
}

/// Topic settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TopicSettings {
    /// Defaults applied to every topic.
    #[serde(default)]
    pub defaults: TopicDefaults,
    /// Cluster topics with these prefixes are never removed.
    #[serde(default, alias = "exclude")]
    pub blacklist: Option<PrefixList>,
    /// When set, only cluster topics with these prefixes are managed.
    #[serde(default, alias = "include")]
    pub whitelist: Option<PrefixList>,
}

/// Topic defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TopicDefaults {
    /// Replication factor for topics that do not set their own.
    #[serde(default)]
    pub replication: Option<i32>,
}

/// A list of topic name prefixes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PrefixList {
    /// The prefixes.
    #[serde(default)]
    pub prefixed: Vec<String>,
}

/// Service-wide settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceSettings {
    /// ACL generation options.
    #[serde(default)]
    pub acls: ServiceAclSettings,
}

/// ACL generation options for services.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceAclSettings {
    /// Also emit DESCRIBE for every topic a service reads or writes.
    #[serde(default, rename = "describe-topic-enabled")]
    pub describe_topic_enabled: bool,
}

/// Auxiliary files, resolved relative to the main state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    /// File holding additional services.
    #[serde(default)]
    pub services: Option<String>,
    /// File holding additional topics.
    #[serde(default)]
    pub topics: Option<String>,
    /// File holding additional users.
    #[serde(default)]
    pub users: Option<String>,
}

/// A service, tagged by archetype.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServiceDetails {
    /// Plain producer/consumer.
    Application(ApplicationService),
    /// Kafka Connect worker cluster.
    KafkaConnect(KafkaConnectService),
    /// Kafka Streams application.
    KafkaStreams(KafkaStreamsService),
}

/// Plain producer/consumer service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationService {
    /// Explicit principal.
    #[serde(default)]
    pub principal: Option<String>,
    /// Consumer group id; defaults to the service name.
    #[serde(default, rename = "group-id")]
    pub group_id: Option<String>,
    /// Topics written.
    #[serde(default)]
    pub produces: Vec<String>,
    /// Topics read.
    #[serde(default)]
    pub consumes: Vec<String>,
}

/// Kafka Connect worker cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KafkaConnectService {
    /// Explicit principal.
    #[serde(default)]
    pub principal: Option<String>,
    /// Worker group id; defaults to the service name.
    #[serde(default, rename = "group-id")]
    pub group_id: Option<String>,
    /// Storage topic name overrides.
    #[serde(default, rename = "storage-topics")]
    pub storage_topics: Option<StorageTopics>,
    /// Topics written by the workers themselves.
    #[serde(default)]
    pub produces: Vec<String>,
    /// Connectors hosted by this cluster.
    #[serde(default)]
    pub connectors: BTreeMap<String, ConnectorDetails>,
}

/// Kafka Connect storage topic overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageTopics {
    /// Config storage topic.
    #[serde(default)]
    pub config: Option<String>,
    /// Offset storage topic.
    #[serde(default)]
    pub offset: Option<String>,
    /// Status storage topic.
    #[serde(default)]
    pub status: Option<String>,
}

/// A connector hosted by a Kafka Connect service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectorDetails {
    /// Topics written.
    #[serde(default)]
    pub produces: Vec<String>,
    /// Topics read.
    #[serde(default)]
    pub consumes: Vec<String>,
}

/// Kafka Streams application.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KafkaStreamsService {
    /// Explicit principal.
    #[serde(default)]
    pub principal: Option<String>,
    /// Topics written.
    #[serde(default)]
    pub produces: Vec<String>,
    /// Topics read.
    #[serde(default)]
    pub consumes: Vec<String>,
}

/// A human or tooling user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UserDetails {
    /// Explicit principal.
    #[serde(default)]
    pub principal: Option<String>,
    /// Role names, expanded in order.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// A hand-written ACL attached to a service or user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CustomAclDetails {
    /// Resource name.
    pub name: String,
    /// Resource type.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource pattern.
    pub pattern: String,
    /// Principal; defaults to the owner's principal.
    #[serde(default)]
    pub principal: Option<String>,
    /// Client host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Operation.
    pub operation: String,
    /// Permission.
    #[serde(default = "default_permission")]
    pub permission: String,
}

fn default_host() -> String {
    String::from(crate::state::ANY_HOST)
}

fn default_permission() -> String {
    String::from(AclPermission::Allow.as_str())
}

impl DesiredStateFile {
    /// Returns the global default replication factor, if configured.
    #[must_use]
    pub const fn default_replication(&self) -> Option<i32> {
        self.settings.topics.defaults.replication
    }

    /// Returns true if principals come from the account directory.
    #[must_use]
    pub const fn is_cloud_enabled(&self) -> bool {
        self.settings.ccloud.enabled
    }

    /// Returns true if services also get DESCRIBE on their topics.
    #[must_use]
    pub const fn is_describe_acl_enabled(&self) -> bool {
        self.settings.services.acls.describe_topic_enabled
    }

    /// Returns the explicitly configured ignore prefixes.
    #[must_use]
    pub fn blacklist_prefixes(&self) -> &[String] {
        self.settings
            .topics
            .blacklist
            .as_ref()
            .map(|list| list.prefixed.as_slice())
            .unwrap_or_default()
    }

    /// Returns the explicitly configured accept prefixes.
    #[must_use]
    pub fn whitelist_prefixes(&self) -> &[String] {
        self.settings
            .topics
            .whitelist
            .as_ref()
            .map(|list| list.prefixed.as_slice())
            .unwrap_or_default()
    }

    /// Merges the maps of an auxiliary file over this one.
    pub fn merge_services(&mut self, other: Self) {
        self.services.extend(other.services);
    }

    /// Merges the topics of an auxiliary file over this one.
    pub fn merge_topics(&mut self, other: Self) {
        self.topics.extend(other.topics);
    }

    /// Merges the users of an auxiliary file over this one.
    pub fn merge_users(&mut self, other: Self) {
        self.users.extend(other.users);
    }
}

impl ServiceDetails {
    /// Returns the explicitly declared principal.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        match self {
            Self::Application(s) => s.principal.as_deref(),
            Self::KafkaConnect(s) => s.principal.as_deref(),
            Self::KafkaStreams(s) => s.principal.as_deref(),
        }
    }

    /// Returns true for archetypes that own internal topics under their name.
    #[must_use]
    pub const fn owns_internal_topics(&self) -> bool {
        matches!(self, Self::KafkaStreams(_))
    }

    /// Returns the archetype tag as written in the state file.
    #[must_use]
    pub const fn archetype(&self) -> &'static str {
        match self {
            Self::Application(_) => "application",
            Self::KafkaConnect(_) => "kafka-connect",
            Self::KafkaStreams(_) => "kafka-streams",
        }
    }
}

impl CustomAclDetails {
    /// Checks that every enumerated field holds an allowed value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAclDefinition` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.to_acl_details("").map(|_| ())
    }

    /// Converts to a concrete ACL bound to `fallback_principal` unless this
    /// entry declares its own principal.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAclDefinition` naming the first offending field.
    pub fn to_acl_details(&self, fallback_principal: &str) -> Result<AclDetails, ConfigError> {
        Ok(AclDetails {
            name: self.name.clone(),
            resource_type: parse_field(&self.resource_type, "type", ResourceType::allowed_values)?,
            pattern: parse_field(&self.pattern, "pattern", PatternType::allowed_values)?,
            principal: self
                .principal
                .clone()
                .unwrap_or_else(|| fallback_principal.to_string()),
            host: self.host.clone(),
            operation: parse_field(&self.operation, "operation", AclOperation::allowed_values)?,
            permission: parse_field(&self.permission, "permission", AclPermission::allowed_values)?,
        })
    }
}

fn parse_field<T: FromStr>(
    value: &str,
    field: &str,
    allowed_values: fn() -> Vec<String>,
) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidAclDefinition {
        field: field.to_string(),
        value: value.to_string(),
        allowed_values: allowed_values(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(resource_type: &str, pattern: &str, operation: &str) -> CustomAclDetails {
        CustomAclDetails {
            name: String::from("audit."),
            resource_type: resource_type.to_string(),
            pattern: pattern.to_string(),
            principal: None,
            host: default_host(),
            operation: operation.to_string(),
            permission: default_permission(),
        }
    }

    #[test]
    fn test_custom_acl_conversion() {
        let acl = custom("TOPIC", "PREFIXED", "READ")
            .to_acl_details("User:auditor")
            .unwrap();
        assert_eq!(acl.resource_type, ResourceType::Topic);
        assert_eq!(acl.pattern, PatternType::Prefixed);
        assert_eq!(acl.principal, "User:auditor");
        assert_eq!(acl.host, "*");
        assert_eq!(acl.permission, AclPermission::Allow);
    }

    #[test]
    fn test_custom_acl_own_principal_wins() {
        let mut details = custom("GROUP", "LITERAL", "READ");
        details.principal = Some(String::from("User:other"));
        let acl = details.to_acl_details("User:owner").unwrap();
        assert_eq!(acl.principal, "User:other");
    }

    #[test]
    fn test_custom_acl_rejects_sentinels() {
        let err = custom("TOPIC", "ANY", "READ").validate().unwrap_err();
        match err {
            ConfigError::InvalidAclDefinition {
                field,
                allowed_values,
                ..
            } => {
                assert_eq!(field, "pattern");
                assert_eq!(allowed_values, vec!["MATCH", "LITERAL", "PREFIXED"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(custom("TOPIC", "LITERAL", "UNKNOWN").validate().is_err());
    }

    #[test]
    fn test_service_archetype_tag() {
        let yaml = r"
type: kafka-connect
principal: User:connect
produces: [orders]
storage-topics:
  config: my-configs
connectors:
  jdbc-sink:
    consumes: [payments]
";
        let service: ServiceDetails = serde_yaml::from_str(yaml).unwrap();
        let ServiceDetails::KafkaConnect(connect) = &service else {
            panic!("expected kafka-connect, got {}", service.archetype());
        };
        assert_eq!(connect.produces, vec!["orders"]);
        assert_eq!(
            connect.storage_topics.as_ref().and_then(|t| t.config.as_deref()),
            Some("my-configs")
        );
        assert_eq!(connect.connectors["jdbc-sink"].consumes, vec!["payments"]);
        assert_eq!(service.principal(), Some("User:connect"));
    }
}
