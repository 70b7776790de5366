//! Desired state resolution.
//!
//! This module provides:
//! - The resolved resource types shared with the planner and cluster clients
//! - The role table and service archetype expansion
//! - The resolver producing a [`DesiredState`] from a state file

mod desired;
mod expand;
mod resolver;
mod roles;
mod types;

pub use desired::DesiredState;
pub use expand::{ExpandOptions, expand_service};
pub use resolver::StateResolver;
pub use roles::{AclTemplate, CLUSTER_RESOURCE, RoleTable, WILDCARD};
pub use types::{
    ANY_HOST, AclDetails, AclOperation, AclPermission, PatternType, ResourceType, TopicDetails,
};
