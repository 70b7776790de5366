//! Point-in-time view of the cluster.

use std::collections::BTreeMap;
use tracing::{debug, info};

use super::client::ClusterClient;
use super::types::ConfigEntry;
use crate::error::Result;
use crate::state::AclDetails;

/// Topics, topic configs and access entries fetched once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterSnapshot {
    /// Topic names.
    pub topics: Vec<String>,
    /// Config entries per topic.
    pub configs: BTreeMap<String, Vec<ConfigEntry>>,
    /// Access entries.
    pub acls: Vec<AclDetails>,
}

impl ClusterSnapshot {
    /// Fetches a snapshot, leaving out the skipped resource kinds.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by the client.
    pub async fn fetch<C: ClusterClient + ?Sized>(
        client: &C,
        skip_topics: bool,
        skip_acls: bool,
    ) -> Result<Self> {
        let mut snapshot = Self::default();

        if skip_topics {
            debug!("Skipping topic snapshot");
        } else {
            snapshot.topics = client.list_topics().await?;
            snapshot.configs = client.describe_configs(&snapshot.topics).await?;
        }

        if skip_acls {
            debug!("Skipping ACL snapshot");
        } else {
            snapshot.acls = client.list_acls().await?;
        }

        info!(
            "Fetched cluster snapshot from {}: {} topics, {} ACLs",
            client.backend_type(),
            snapshot.topics.len(),
            snapshot.acls.len()
        );
        Ok(snapshot)
    }

    /// Returns true if the topic exists.
    #[must_use]
    pub fn has_topic(&self, name: &str) -> bool {
        self.topics.iter().any(|t| t == name)
    }

    /// Returns the config entries of a topic.
    #[must_use]
    pub fn topic_configs(&self, name: &str) -> &[ConfigEntry] {
        self.configs.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::InMemoryCluster;
    use crate::state::{AclOperation, TopicDetails};

    #[tokio::test]
    async fn test_fetch_respects_skip_flags() {
        let cluster = InMemoryCluster::new()
            .with_topic("orders", TopicDetails::new(1, 1).with_config("retention.ms", "1"))
            .with_acl(AclDetails::topic("orders", "User:a", AclOperation::Read));

        let full = ClusterSnapshot::fetch(&cluster, false, false).await.unwrap();
        assert!(full.has_topic("orders"));
        assert_eq!(full.topic_configs("orders").len(), 1);
        assert_eq!(full.acls.len(), 1);

        let topics_only = ClusterSnapshot::fetch(&cluster, false, true).await.unwrap();
        assert!(topics_only.acls.is_empty());

        let acls_only = ClusterSnapshot::fetch(&cluster, true, false).await.unwrap();
        assert!(acls_only.topics.is_empty());
        assert!(acls_only.topic_configs("orders").is_empty());
    }
}
