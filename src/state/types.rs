//! Resolved resource types shared by the resolver, the planner and the
//! cluster clients.
//!
//! The enumerations mirror the names Kafka uses on the wire. The `ANY` and
//! `UNKNOWN` sentinels are filters, never concrete bindings, so they have no
//! variant here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declares a closed Kafka enumeration with its wire names.
macro_rules! kafka_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant, )+
        }

        impl $name {
            /// Every concrete value, in declaration order.
            pub const ALL: &'static [Self] = &[ $( Self::$variant ),+ ];

            /// Returns the wire name.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }

            /// Returns the wire names of every concrete value.
            #[must_use]
            pub fn allowed_values() -> Vec<String> {
                Self::ALL.iter().map(|v| v.as_str().to_string()).collect()
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    other => Err(other.to_string()),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

kafka_enum! {
    /// Kind of resource an ACL protects.
    ResourceType {
        /// A topic.
        Topic => "TOPIC",
        /// A consumer group.
        Group => "GROUP",
        /// The cluster itself.
        Cluster => "CLUSTER",
        /// A transactional id.
        TransactionalId => "TRANSACTIONAL_ID",
        /// A delegation token.
        DelegationToken => "DELEGATION_TOKEN",
        /// A user principal.
        User => "USER",
    }
}

kafka_enum! {
    /// How an ACL resource name is matched.
    PatternType {
        /// Any literal or prefix pattern that matches.
        Match => "MATCH",
        /// Exact name, or `*` for every resource.
        Literal => "LITERAL",
        /// Name prefix.
        Prefixed => "PREFIXED",
    }
}

kafka_enum! {
    /// Operation an ACL allows or denies.
    AclOperation {
        /// Every operation.
        All => "ALL",
        /// Read.
        Read => "READ",
        /// Write.
        Write => "WRITE",
        /// Create.
        Create => "CREATE",
        /// Delete.
        Delete => "DELETE",
        /// Alter.
        Alter => "ALTER",
        /// Describe.
        Describe => "DESCRIBE",
        /// Inter-broker cluster action.
        ClusterAction => "CLUSTER_ACTION",
        /// Describe configs.
        DescribeConfigs => "DESCRIBE_CONFIGS",
        /// Alter configs.
        AlterConfigs => "ALTER_CONFIGS",
        /// Idempotent write.
        IdempotentWrite => "IDEMPOTENT_WRITE",
        /// Create delegation tokens.
        CreateTokens => "CREATE_TOKENS",
        /// Describe delegation tokens.
        DescribeTokens => "DESCRIBE_TOKENS",
    }
}

kafka_enum! {
    /// Whether an ACL grants or refuses its operation.
    AclPermission {
        /// Refuse.
        Deny => "DENY",
        /// Grant.
        Allow => "ALLOW",
    }
}

/// Host value matching every client host.
pub const ANY_HOST: &str = "*";

/// Topic definition: partition count, replication and topic-level configs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TopicDetails {
    /// Number of partitions.
    pub partitions: i32,
    /// Replication factor; always set once the state is resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication: Option<i32>,
    /// Topic-level configuration overrides.
    #[serde(default)]
    pub configs: BTreeMap<String, String>,
}

impl TopicDetails {
    /// Creates topic details with an explicit replication factor and no configs.
    #[must_use]
    pub const fn new(partitions: i32, replication: i32) -> Self {
        Self {
            partitions,
            replication: Some(replication),
            configs: BTreeMap::new(),
        }
    }

    /// Adds a configuration entry.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configs.insert(key.into(), value.into());
        self
    }
}

/// A single access-control entry.
///
/// Equality covers the full binding (resource name, resource type, pattern,
/// principal, host, operation, permission) and nothing else, which is what
/// the planner uses as identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AclDetails {
    /// Resource name.
    pub name: String,
    /// Resource type.
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Resource name pattern.
    pub pattern: PatternType,
    /// Principal, e.g. `User:alice`.
    pub principal: String,
    /// Client host.
    pub host: String,
    /// Operation.
    pub operation: AclOperation,
    /// Permission.
    pub permission: AclPermission,
}

impl AclDetails {
    /// Creates an ALLOW entry for any host.
    #[must_use]
    pub fn new(
        resource_type: ResourceType,
        name: impl Into<String>,
        pattern: PatternType,
        principal: impl Into<String>,
        operation: AclOperation,
    ) -> Self {
        Self {
            name: name.into(),
            resource_type,
            pattern,
            principal: principal.into(),
            host: String::from(ANY_HOST),
            operation,
            permission: AclPermission::Allow,
        }
    }

    /// Creates a literal topic entry.
    #[must_use]
    pub fn topic(topic: &str, principal: &str, operation: AclOperation) -> Self {
        Self::new(ResourceType::Topic, topic, PatternType::Literal, principal, operation)
    }

    /// Creates a literal consumer group entry.
    #[must_use]
    pub fn group(group: &str, principal: &str, operation: AclOperation) -> Self {
        Self::new(ResourceType::Group, group, PatternType::Literal, principal, operation)
    }
}

impl std::fmt::Display for AclDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}:{}:{} {}@{} {}",
            self.permission,
            self.resource_type,
            self.pattern,
            self.name,
            self.principal,
            self.host,
            self.operation
        )
    }
}
