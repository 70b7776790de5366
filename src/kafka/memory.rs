//! In-memory cluster backend.
//!
//! Keeps topics and ACLs in process as a stand-in cluster for tests. Failures
//! can be injected per resource name to exercise the apply error path.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::debug;

use super::client::ClusterClient;
use super::types::{ConfigChange, ConfigEntry, ConfigSource};
use crate::error::{KafkaError, Result};
use crate::state::{AclDetails, TopicDetails};

/// A mutating call received by the in-memory cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    /// Topic creation.
    CreateTopic(String),
    /// Topic reconfiguration.
    AlterTopicConfig(String, Vec<ConfigChange>),
    /// Topic deletion.
    DeleteTopic(String),
    /// ACL creation.
    CreateAcl(AclDetails),
    /// ACL deletion.
    DeleteAcl(AclDetails),
}

#[derive(Debug, Default)]
struct Inner {
    topics: BTreeMap<String, TopicDetails>,
    broker_defaults: BTreeMap<String, String>,
    acls: Vec<AclDetails>,
    failures: HashMap<String, String>,
    calls: Vec<ClusterCall>,
}

/// In-memory cluster.
#[derive(Debug, Default)]
pub struct InMemoryCluster {
    inner: Mutex<Inner>,
}

impl InMemoryCluster {
    /// Creates an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a topic.
    #[must_use]
    pub fn with_topic(mut self, name: impl Into<String>, details: TopicDetails) -> Self {
        self.inner.get_mut().topics.insert(name.into(), details);
        self
    }

    /// Adds a broker default reported for every topic that does not override it.
    #[must_use]
    pub fn with_broker_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner
            .get_mut()
            .broker_defaults
            .insert(key.into(), value.into());
        self
    }

    /// Adds an ACL.
    #[must_use]
    pub fn with_acl(mut self, acl: AclDetails) -> Self {
        self.inner.get_mut().acls.push(acl);
        self
    }

    /// Makes every mutating call on the named topic or ACL resource fail.
    #[must_use]
    pub fn with_failure(mut self, resource_name: impl Into<String>, message: impl Into<String>) -> Self {
        self.inner
            .get_mut()
            .failures
            .insert(resource_name.into(), message.into());
        self
    }

    /// Returns the mutating calls received so far, in order.
    pub async fn calls(&self) -> Vec<ClusterCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Returns the current topics.
    pub async fn topics(&self) -> BTreeMap<String, TopicDetails> {
        self.inner.lock().await.topics.clone()
    }

    /// Returns the current ACLs.
    pub async fn acls(&self) -> Vec<AclDetails> {
        self.inner.lock().await.acls.clone()
    }
}

impl Inner {
    fn record(&mut self, resource_name: &str, call: ClusterCall) -> Result<()> {
        self.calls.push(call);
        match self.failures.get(resource_name) {
            Some(message) => Err(KafkaError::api_error(400, message.clone()).into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn list_topics(&self) -> Result<Vec<String>> {
        Ok(self.inner.lock().await.topics.keys().cloned().collect())
    }

    async fn describe_configs(&self, topics: &[String]) -> Result<BTreeMap<String, Vec<ConfigEntry>>> {
        let inner = self.inner.lock().await;
        let mut result = BTreeMap::new();

        for name in topics {
            let Some(topic) = inner.topics.get(name) else {
                continue;
            };
            let mut entries: Vec<ConfigEntry> = topic
                .configs
                .iter()
                .map(|(key, value)| ConfigEntry::dynamic(key, value))
                .collect();
            entries.extend(
                inner
                    .broker_defaults
                    .iter()
                    .filter(|(key, _)| !topic.configs.contains_key(*key))
                    .map(|(key, value)| ConfigEntry {
                        name: key.clone(),
                        value: Some(value.clone()),
                        source: ConfigSource::DefaultConfig,
                    }),
            );
            result.insert(name.clone(), entries);
        }

        Ok(result)
    }

    async fn list_acls(&self) -> Result<Vec<AclDetails>> {
        Ok(self.inner.lock().await.acls.clone())
    }

    async fn create_topic(&self, name: &str, details: &TopicDetails) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.record(name, ClusterCall::CreateTopic(name.to_string()))?;

        if inner.topics.contains_key(name) {
            return Err(KafkaError::api_error(400, format!("Topic '{name}' already exists.")).into());
        }
        debug!("Created topic {name}");
        inner.topics.insert(name.to_string(), details.clone());
        Ok(())
    }

    async fn alter_topic_config(&self, name: &str, changes: &[ConfigChange]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.record(
            name,
            ClusterCall::AlterTopicConfig(name.to_string(), changes.to_vec()),
        )?;

        let topic = inner.topics.get_mut(name).ok_or_else(|| {
            KafkaError::api_error(404, format!("This server does not host this topic: {name}"))
        })?;
        for change in changes {
            match &change.value {
                Some(value) => {
                    topic.configs.insert(change.key.clone(), value.clone());
                }
                None => {
                    topic.configs.remove(&change.key);
                }
            }
        }
        Ok(())
    }

    async fn delete_topic(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.record(name, ClusterCall::DeleteTopic(name.to_string()))?;

        if inner.topics.remove(name).is_none() {
            return Err(KafkaError::api_error(
                404,
                format!("This server does not host this topic: {name}"),
            )
            .into());
        }
        Ok(())
    }

    async fn create_acl(&self, acl: &AclDetails) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.record(&acl.name, ClusterCall::CreateAcl(acl.clone()))?;

        if !inner.acls.contains(acl) {
            inner.acls.push(acl.clone());
        }
        Ok(())
    }

    async fn delete_acl(&self, acl: &AclDetails) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.record(&acl.name, ClusterCall::DeleteAcl(acl.clone()))?;

        inner.acls.retain(|existing| existing != acl);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AclOperation;

    #[tokio::test]
    async fn test_alter_topic_config() {
        let cluster = InMemoryCluster::new()
            .with_topic("orders", TopicDetails::new(1, 1).with_config("retention.ms", "1"));

        cluster
            .alter_topic_config(
                "orders",
                &[
                    ConfigChange::delete("retention.ms"),
                    ConfigChange::set("cleanup.policy", "compact"),
                ],
            )
            .await
            .unwrap();

        let topics = cluster.topics().await;
        assert_eq!(topics["orders"].configs.len(), 1);
        assert_eq!(topics["orders"].configs["cleanup.policy"], "compact");
    }

    #[tokio::test]
    async fn test_broker_defaults_reported_with_source() {
        let cluster = InMemoryCluster::new()
            .with_broker_default("retention.ms", "604800000")
            .with_topic("orders", TopicDetails::new(1, 1));

        let configs = cluster
            .describe_configs(&[String::from("orders")])
            .await
            .unwrap();
        assert_eq!(configs["orders"][0].source, ConfigSource::DefaultConfig);
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded() {
        let acl = AclDetails::topic("orders", "User:a", AclOperation::Read);
        let cluster = InMemoryCluster::new().with_failure("orders", "not authorized");

        let err = cluster.create_acl(&acl).await.unwrap_err();
        assert!(err.to_string().contains("not authorized"));
        assert_eq!(cluster.calls().await, vec![ClusterCall::CreateAcl(acl)]);
        assert!(cluster.acls().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_existing_topic_fails() {
        let cluster = InMemoryCluster::new().with_topic("orders", TopicDetails::new(1, 1));
        assert!(cluster
            .create_topic("orders", &TopicDetails::new(1, 1))
            .await
            .is_err());
    }
}
