//! Cluster client trait definition.
//!
//! This module defines the common interface for cluster backends. Every call
//! is a single request/response; backends may retry transient failures
//! internally but callers impose no policy of their own.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::types::{ConfigChange, ConfigEntry};
use crate::error::Result;
use crate::state::{AclDetails, TopicDetails};

/// Trait for cluster backends.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Lists topic names.
    async fn list_topics(&self) -> Result<Vec<String>>;

    /// Describes the config entries of the given topics.
    async fn describe_configs(&self, topics: &[String]) -> Result<BTreeMap<String, Vec<ConfigEntry>>>;

    /// Lists every access entry.
    async fn list_acls(&self) -> Result<Vec<AclDetails>>;

    /// Creates a topic.
    async fn create_topic(&self, name: &str, details: &TopicDetails) -> Result<()>;

    /// Sets or deletes topic config overrides.
    async fn alter_topic_config(&self, name: &str, changes: &[ConfigChange]) -> Result<()>;

    /// Deletes a topic.
    async fn delete_topic(&self, name: &str) -> Result<()>;

    /// Creates an access entry.
    async fn create_acl(&self, acl: &AclDetails) -> Result<()>;

    /// Deletes the access entry matching the full binding.
    async fn delete_acl(&self, acl: &AclDetails) -> Result<()>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl ClusterClient for Box<dyn ClusterClient> {
    async fn list_topics(&self) -> Result<Vec<String>> {
        (**self).list_topics().await
    }

    async fn describe_configs(&self, topics: &[String]) -> Result<BTreeMap<String, Vec<ConfigEntry>>> {
        (**self).describe_configs(topics).await
    }

    async fn list_acls(&self) -> Result<Vec<AclDetails>> {
        (**self).list_acls().await
    }

    async fn create_topic(&self, name: &str, details: &TopicDetails) -> Result<()> {
        (**self).create_topic(name, details).await
    }

    async fn alter_topic_config(&self, name: &str, changes: &[ConfigChange]) -> Result<()> {
        (**self).alter_topic_config(name, changes).await
    }

    async fn delete_topic(&self, name: &str) -> Result<()> {
        (**self).delete_topic(name).await
    }

    async fn create_acl(&self, acl: &AclDetails) -> Result<()> {
        (**self).create_acl(acl).await
    }

    async fn delete_acl(&self, acl: &AclDetails) -> Result<()> {
        (**self).delete_acl(acl).await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
