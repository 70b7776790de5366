//! Kafka REST Proxy v3 backend.
//!
//! This module provides the HTTP client that implements the cluster
//! contract on top of the REST Proxy (or Confluent Server) v3 API.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::client::ClusterClient;
use super::types::{ConfigChange, ConfigEntry, ConfigSource};
use crate::config::ClusterConfig;
use crate::error::{GitopsError, KafkaError, Result};
use crate::state::{AclDetails, TopicDetails};

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Kafka REST Proxy client bound to one cluster.
#[derive(Debug, Clone)]
pub struct RestClusterClient {
    /// HTTP client.
    client: Client,
    /// Proxy settings.
    config: ClusterConfig,
    /// Cluster id used in every path.
    cluster_id: String,
}

#[derive(Debug, Deserialize)]
struct DataList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ClusterItem {
    cluster_id: String,
}

#[derive(Debug, Deserialize)]
struct TopicItem {
    topic_name: String,
}

#[derive(Debug, Deserialize)]
struct ConfigItem {
    name: String,
    #[serde(default)]
    value: Option<String>,
    source: ConfigSource,
}

#[derive(Debug, Serialize, Deserialize)]
struct AclItem {
    resource_type: String,
    resource_name: String,
    pattern_type: String,
    principal: String,
    host: String,
    operation: String,
    permission: String,
}

#[derive(Debug, Serialize)]
struct CreateTopicRequest<'a> {
    topic_name: &'a str,
    partitions_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    replication_factor: Option<i32>,
    configs: Vec<ConfigValue<'a>>,
}

#[derive(Debug, Serialize)]
struct ConfigValue<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct AlterConfigsRequest<'a> {
    data: Vec<AlterConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct AlterConfig<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operation: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Empty response marker.
#[derive(Debug, Deserialize)]
struct Ignored {}

impl From<&AclDetails> for AclItem {
    fn from(acl: &AclDetails) -> Self {
        Self {
            resource_type: acl.resource_type.to_string(),
            resource_name: acl.name.clone(),
            pattern_type: acl.pattern.to_string(),
            principal: acl.principal.clone(),
            host: acl.host.clone(),
            operation: acl.operation.to_string(),
            permission: acl.permission.to_string(),
        }
    }
}

impl AclItem {
    fn into_acl(self) -> Option<AclDetails> {
        Some(AclDetails {
            resource_type: self.resource_type.parse().ok()?,
            name: self.resource_name,
            pattern: self.pattern_type.parse().ok()?,
            principal: self.principal,
            host: self.host,
            operation: self.operation.parse().ok()?,
            permission: self.permission.parse().ok()?,
        })
    }

    fn query(&self) -> [(&'static str, &str); 7] {
        [
            ("resource_type", self.resource_type.as_str()),
            ("resource_name", self.resource_name.as_str()),
            ("pattern_type", self.pattern_type.as_str()),
            ("principal", self.principal.as_str()),
            ("host", self.host.as_str()),
            ("operation", self.operation.as_str()),
            ("permission", self.permission.as_str()),
        ]
    }
}

impl RestClusterClient {
    /// Connects to the proxy, discovering the cluster id if not configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created or the cluster
    /// id cannot be discovered.
    pub async fn connect(config: ClusterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| KafkaError::network(format!("Failed to create HTTP client: {e}")))?;

        let mut this = Self {
            client,
            cluster_id: config.cluster_id.clone().unwrap_or_default(),
            config,
        };

        if this.cluster_id.is_empty() {
            let clusters: DataList<ClusterItem> = this.send(Method::GET, "/v3/clusters", None::<&()>, &[]).await?;
            this.cluster_id = clusters
                .data
                .into_iter()
                .next()
                .map(|c| c.cluster_id)
                .ok_or_else(|| KafkaError::invalid_response("The proxy reported no clusters"))?;
            debug!("Discovered cluster id {}", this.cluster_id);
        }

        Ok(this)
    }

    /// Returns the cluster id in use.
    #[must_use]
    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    fn cluster_path(&self, suffix: &str) -> String {
        format!("/v3/clusters/{}{suffix}", self.cluster_id)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.config.rest_url.trim_end_matches('/'));
        let request = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json");
        match &self.config.credentials {
            Some(credentials) => request.basic_auth(&credentials.username, Some(&credentials.password)),
            None => request,
        }
    }

    /// Sends a request, retrying transient failures.
    ///
    /// Reads are retried on any transient failure. Mutations are retried only
    /// when rate limited, since a timed-out create or delete may already have
    /// taken effect on the cluster.
    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: &[(&str, &str)],
    ) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = last_error
                    .as_ref()
                    .and_then(GitopsError::retry_delay_secs)
                    .map_or(RETRY_DELAY_MS * u64::from(attempt), |secs| secs * 1000);
                debug!("Retry attempt {attempt} of {MAX_RETRIES}");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let mut request = self.request(method.clone(), path).query(query);
            if let Some(body) = body {
                request = request.json(body);
            }

            match Self::send_once::<T>(request).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if e.is_retryable() && (method == Method::GET || is_rate_limited(&e)) {
                        warn!("Transient failure calling {path}: {e}");
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            GitopsError::Kafka(KafkaError::NetworkError {
                message: String::from("Max retries exceeded"),
            })
        }))
    }

    async fn send_once<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| KafkaError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        trace!("REST proxy responded with {status}");

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(1);
            return Err(GitopsError::Kafka(KafkaError::RateLimited {
                retry_after_secs: retry_after,
            }));
        }

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(GitopsError::Kafka(KafkaError::AuthenticationFailed {
                message: format!("The REST proxy refused the credentials ({status})"),
            }));
        }

        if status.is_server_error() && status.as_u16() != 500 {
            return Err(KafkaError::network(format!("Proxy unavailable: {status}")).into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(body);
            return Err(KafkaError::api_error(status.as_u16(), message).into());
        }

        // Mutating endpoints answer with an empty body.
        let bytes = response
            .bytes()
            .await
            .map_err(|e| KafkaError::network(format!("Failed to read response: {e}")))?;
        let bytes: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };

        serde_json::from_slice(bytes).map_err(|e| {
            GitopsError::Kafka(KafkaError::InvalidResponse {
                message: format!("Failed to parse response: {e}"),
            })
        })
    }
}

const fn is_rate_limited(error: &GitopsError) -> bool {
    matches!(error, GitopsError::Kafka(KafkaError::RateLimited { .. }))
}

#[async_trait]
impl ClusterClient for RestClusterClient {
    async fn list_topics(&self) -> Result<Vec<String>> {
        let path = self.cluster_path("/topics");
        let topics: DataList<TopicItem> = self.send(Method::GET, &path, None::<&()>, &[]).await?;
        Ok(topics.data.into_iter().map(|t| t.topic_name).collect())
    }

    async fn describe_configs(&self, topics: &[String]) -> Result<BTreeMap<String, Vec<ConfigEntry>>> {
        let mut result = BTreeMap::new();
        for topic in topics {
            let path = self.cluster_path(&format!("/topics/{topic}/configs"));
            let configs: DataList<ConfigItem> = self.send(Method::GET, &path, None::<&()>, &[]).await?;
            let entries = configs
                .data
                .into_iter()
                .map(|c| ConfigEntry {
                    name: c.name,
                    value: c.value,
                    source: c.source,
                })
                .collect();
            result.insert(topic.clone(), entries);
        }
        Ok(result)
    }

    async fn list_acls(&self) -> Result<Vec<AclDetails>> {
        let path = self.cluster_path("/acls");
        let acls: DataList<AclItem> = self.send(Method::GET, &path, None::<&()>, &[]).await?;

        let mut result = Vec::with_capacity(acls.data.len());
        for item in acls.data {
            let description = format!("{item:?}");
            match item.into_acl() {
                Some(acl) => result.push(acl),
                None => warn!("Skipping ACL with unsupported binding: {description}"),
            }
        }
        Ok(result)
    }

    async fn create_topic(&self, name: &str, details: &TopicDetails) -> Result<()> {
        let body = CreateTopicRequest {
            topic_name: name,
            partitions_count: details.partitions,
            replication_factor: details.replication,
            configs: details
                .configs
                .iter()
                .map(|(name, value)| ConfigValue { name, value })
                .collect(),
        };
        let path = self.cluster_path("/topics");
        let _: Ignored = self.send(Method::POST, &path, Some(&body), &[]).await?;
        Ok(())
    }

    async fn alter_topic_config(&self, name: &str, changes: &[ConfigChange]) -> Result<()> {
        let body = AlterConfigsRequest {
            data: changes
                .iter()
                .map(|change| AlterConfig {
                    name: &change.key,
                    value: change.value.as_deref(),
                    operation: change.value.is_none().then_some("DELETE"),
                })
                .collect(),
        };
        let path = self.cluster_path(&format!("/topics/{name}/configs:alter"));
        let _: Ignored = self.send(Method::POST, &path, Some(&body), &[]).await?;
        Ok(())
    }

    async fn delete_topic(&self, name: &str) -> Result<()> {
        let path = self.cluster_path(&format!("/topics/{name}"));
        let _: Ignored = self.send(Method::DELETE, &path, None::<&()>, &[]).await?;
        Ok(())
    }

    async fn create_acl(&self, acl: &AclDetails) -> Result<()> {
        let body = AclItem::from(acl);
        let path = self.cluster_path("/acls");
        let _: Ignored = self.send(Method::POST, &path, Some(&body), &[]).await?;
        Ok(())
    }

    async fn delete_acl(&self, acl: &AclDetails) -> Result<()> {
        let item = AclItem::from(acl);
        let path = self.cluster_path("/acls");
        let _: Ignored = self
            .send(Method::DELETE, &path, None::<&()>, &item.query())
            .await?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "rest"
    }
}
