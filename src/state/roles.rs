//! Role table used to expand user roles into access entries.
//!
//! Each role maps to an ordered list of entry templates. A template carries
//! everything but the principal, which is supplied at expansion time.

use std::collections::BTreeMap;

use super::types::{AclDetails, AclOperation, PatternType, ResourceType};

/// Resource name of the cluster resource.
pub const CLUSTER_RESOURCE: &str = "kafka-cluster";

/// Resource name matching every resource of a type.
pub const WILDCARD: &str = "*";

/// An access entry without its principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclTemplate {
    /// Resource type.
    pub resource_type: ResourceType,
    /// Resource name.
    pub name: &'static str,
    /// Resource pattern.
    pub pattern: PatternType,
    /// Operation.
    pub operation: AclOperation,
}

impl AclTemplate {
    const fn literal(resource_type: ResourceType, name: &'static str, operation: AclOperation) -> Self {
        Self {
            resource_type,
            name,
            pattern: PatternType::Literal,
            operation,
        }
    }

    /// Binds this template to a principal.
    #[must_use]
    pub fn bind(&self, principal: &str) -> AclDetails {
        AclDetails::new(
            self.resource_type,
            self.name,
            self.pattern,
            principal,
            self.operation,
        )
    }
}

const OPERATOR: &[AclTemplate] = &[
    AclTemplate::literal(ResourceType::Cluster, CLUSTER_RESOURCE, AclOperation::Describe),
    AclTemplate::literal(ResourceType::Cluster, CLUSTER_RESOURCE, AclOperation::DescribeConfigs),
    AclTemplate::literal(ResourceType::Topic, WILDCARD, AclOperation::Describe),
    AclTemplate::literal(ResourceType::Topic, WILDCARD, AclOperation::DescribeConfigs),
    AclTemplate::literal(ResourceType::Group, WILDCARD, AclOperation::Describe),
];

const READER: &[AclTemplate] = &[
    AclTemplate::literal(ResourceType::Topic, WILDCARD, AclOperation::Read),
    AclTemplate::literal(ResourceType::Topic, WILDCARD, AclOperation::Describe),
    AclTemplate::literal(ResourceType::Group, WILDCARD, AclOperation::Read),
];

const WRITER: &[AclTemplate] = &[
    AclTemplate::literal(ResourceType::Topic, WILDCARD, AclOperation::Write),
    AclTemplate::literal(ResourceType::Topic, WILDCARD, AclOperation::Describe),
];

/// Mapping of role names to entry templates.
#[derive(Debug, Clone)]
pub struct RoleTable {
    roles: BTreeMap<String, Vec<AclTemplate>>,
}

impl Default for RoleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleTable {
    /// Creates the table with the built-in roles.
    #[must_use]
    pub fn new() -> Self {
        let roles = [("operator", OPERATOR), ("reader", READER), ("writer", WRITER)]
            .into_iter()
            .map(|(name, templates)| (name.to_string(), templates.to_vec()))
            .collect();
        Self { roles }
    }

    /// Returns true if the role is known.
    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    /// Returns the known role names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.roles.keys().cloned().collect()
    }

    /// Expands a role for a principal, or `None` if the role is unknown.
    #[must_use]
    pub fn expand(&self, role: &str, principal: &str) -> Option<Vec<AclDetails>> {
        self.roles
            .get(role)
            .map(|templates| templates.iter().map(|t| t.bind(principal)).collect())
    }
}
