//! Client settings read from the environment.
//!
//! The state file never carries credentials. The cluster and account
//! directory clients are configured from environment variables, optionally
//! loaded from a `.env` file first.

use std::time::Duration;

use crate::error::{ConfigError, GitopsError, Result};

/// Default Kafka REST proxy URL.
pub const DEFAULT_REST_URL: &str = "http://localhost:8082";

/// Default Confluent Cloud API URL.
pub const DEFAULT_CLOUD_API_URL: &str = "https://api.confluent.cloud";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Username/password pair.
#[derive(Clone)]
pub struct Credentials {
    /// Username or API key.
    pub username: String,
    /// Password or API secret.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Kafka REST proxy settings.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Base URL of the REST proxy.
    pub rest_url: String,
    /// Cluster id; discovered from the proxy when absent.
    pub cluster_id: Option<String>,
    /// Basic auth credentials.
    pub credentials: Option<Credentials>,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Confluent Cloud IAM API settings.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// Base URL of the API.
    pub api_url: String,
    /// API key and secret.
    pub credentials: Credentials,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            rest_url: String::from(DEFAULT_REST_URL),
            cluster_id: None,
            credentials: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClusterConfig {
    /// Reads the settings from `KAFKA_REST_*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if only one of username/password is set or the
    /// timeout is not a number.
    pub fn from_env() -> Result<Self> {
        let timeout = match optional("KAFKA_REST_TIMEOUT_SECS") {
            Some(value) => value.parse::<u64>().map_err(|_| {
                GitopsError::Config(ConfigError::validation(
                    format!("KAFKA_REST_TIMEOUT_SECS must be a number of seconds, got '{value}'"),
                    "KAFKA_REST_TIMEOUT_SECS",
                ))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let credentials = match (
            optional("KAFKA_REST_USERNAME"),
            optional("KAFKA_REST_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (None, None) => None,
            (Some(_), None) => return Err(missing("KAFKA_REST_PASSWORD")),
            (None, Some(_)) => return Err(missing("KAFKA_REST_USERNAME")),
        };

        Ok(Self {
            rest_url: optional("KAFKA_REST_URL").unwrap_or_else(|| String::from(DEFAULT_REST_URL)),
            cluster_id: optional("KAFKA_REST_CLUSTER_ID"),
            credentials,
            timeout: Duration::from_secs(timeout),
        })
    }
}

impl CloudConfig {
    /// Reads the settings from `CONFLUENT_CLOUD_*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key or secret is missing.
    pub fn from_env() -> Result<Self> {
        let username = optional("CONFLUENT_CLOUD_API_KEY").ok_or_else(|| missing("CONFLUENT_CLOUD_API_KEY"))?;
        let password =
            optional("CONFLUENT_CLOUD_API_SECRET").ok_or_else(|| missing("CONFLUENT_CLOUD_API_SECRET"))?;

        Ok(Self {
            api_url: optional("CONFLUENT_CLOUD_API_URL")
                .unwrap_or_else(|| String::from(DEFAULT_CLOUD_API_URL)),
            credentials: Credentials { username, password },
        })
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn missing(name: &str) -> GitopsError {
    GitopsError::Config(ConfigError::MissingEnvVar {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials {
            username: String::from("key"),
            password: String::from("hunter2"),
        };
        let debug = format!("{credentials:?}");
        assert!(debug.contains("key"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_cluster_defaults() {
        let config = ClusterConfig::default();
        assert_eq!(config.rest_url, DEFAULT_REST_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.credentials.is_none());
    }
}
