//! Confluent Cloud IAM client.
//!
//! This module provides the HTTP client for the IAM v2 service account API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, trace};

use super::{AccountDirectory, ServiceAccount};
use crate::config::CloudConfig;
use crate::error::{AccountError, GitopsError, Result};

/// Service account collection path.
const SERVICE_ACCOUNTS_PATH: &str = "/iam/v2/service-accounts";

/// Page size used when listing accounts.
const PAGE_SIZE: u32 = 100;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Confluent Cloud IAM client.
#[derive(Debug, Clone)]
pub struct ConfluentCloudClient {
    /// HTTP client.
    client: Client,
    /// API settings.
    config: CloudConfig,
}

#[derive(Debug, Deserialize)]
struct AccountList {
    data: Vec<AccountItem>,
    #[serde(default)]
    metadata: Option<ListMetadata>,
}

#[derive(Debug, Deserialize)]
struct ListMetadata {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountItem {
    id: String,
    display_name: String,
}

#[derive(Debug, Serialize)]
struct CreateAccount<'a> {
    display_name: &'a str,
    description: &'a str,
}

impl From<AccountItem> for ServiceAccount {
    fn from(item: AccountItem) -> Self {
        Self {
            id: item.id,
            name: item.display_name,
        }
    }
}

impl ConfluentCloudClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: CloudConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AccountError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth(
                &self.config.credentials.username,
                Some(&self.config.credentials.password),
            )
            .header(header::ACCEPT, "application/json")
    }

    /// Sends a request, retrying transient failures.
    async fn execute<T: for<'de> Deserialize<'de>>(
        &self,
        build: impl Fn() -> RequestBuilder + Send + Sync,
    ) -> Result<T> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                debug!("Retry attempt {attempt} of {MAX_RETRIES}");
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt)))
                    .await;
            }

            match self.execute_once::<T>(build()).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if e.is_retryable() {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            GitopsError::Account(AccountError::NetworkError {
                message: String::from("Max retries exceeded"),
            })
        }))
    }

    async fn execute_once<T: for<'de> Deserialize<'de>>(&self, request: RequestBuilder) -> Result<T> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| AccountError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        trace!("Confluent Cloud responded with {status}");

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(GitopsError::Account(AccountError::AuthenticationFailed {
                message: String::from("Invalid API key or secret"),
            }));
        }

        if status.as_u16() == 429 || status.is_server_error() {
            return Err(AccountError::network(format!("Transient failure: {status}")).into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AccountError::api_error(status.as_u16(), body).into());
        }

        response.json().await.map_err(|e| {
            GitopsError::Account(AccountError::InvalidResponse {
                message: format!("Failed to parse response: {e}"),
            })
        })
    }
}

#[async_trait]
impl AccountDirectory for ConfluentCloudClient {
    async fn list_accounts(&self) -> Result<Vec<ServiceAccount>> {
        let mut accounts = Vec::new();
        let mut next = Some(format!(
            "{}?page_size={PAGE_SIZE}",
            self.url(SERVICE_ACCOUNTS_PATH)
        ));

        while let Some(url) = next {
            let page: AccountList = self.execute(|| self.client.get(&url)).await?;
            accounts.extend(page.data.into_iter().map(ServiceAccount::from));
            next = page.metadata.and_then(|m| m.next).filter(|n| !n.is_empty());
        }

        debug!("Found {} accounts", accounts.len());
        Ok(accounts)
    }

    async fn create_account(&self, name: &str, is_user: bool) -> Result<ServiceAccount> {
        let body = CreateAccount {
            display_name: name,
            description: if is_user {
                "User account managed by kafka-gitops"
            } else {
                "Service account managed by kafka-gitops"
            },
        };
        let url = self.url(SERVICE_ACCOUNTS_PATH);

        let item: AccountItem = self
            .execute(|| self.client.post(&url).json(&body))
            .await?;
        info!("Created account {} ({})", item.display_name, item.id);
        Ok(item.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use wiremock::matchers::{basic_auth, body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ConfluentCloudClient {
        ConfluentCloudClient::new(CloudConfig {
            api_url: server.uri(),
            credentials: Credentials {
                username: String::from("key"),
                password: String::from("secret"),
            },
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_accounts_follows_pages() {
        let server = MockServer::start().await;
        let second_page = format!("{}/iam/v2/service-accounts?page_token=abc", server.uri());

        Mock::given(method("GET"))
            .and(path(SERVICE_ACCOUNTS_PATH))
            .and(query_param("page_token", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": "sa-2", "display_name": "user-alice"}],
                "metadata": {}
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(SERVICE_ACCOUNTS_PATH))
            .and(query_param("page_size", "100"))
            .and(basic_auth("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": "sa-1", "display_name": "orders", "description": "x"}],
                "metadata": {"next": second_page}
            })))
            .mount(&server)
            .await;

        let accounts = client(&server).list_accounts().await.unwrap();
        assert_eq!(
            accounts,
            vec![
                ServiceAccount {
                    id: String::from("sa-1"),
                    name: String::from("orders"),
                },
                ServiceAccount {
                    id: String::from("sa-2"),
                    name: String::from("user-alice"),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_create_account() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SERVICE_ACCOUNTS_PATH))
            .and(body_json(serde_json::json!({
                "display_name": "orders",
                "description": "Service account managed by kafka-gitops"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "sa-9",
                "display_name": "orders"
            })))
            .mount(&server)
            .await;

        let account = client(&server).create_account("orders", false).await.unwrap();
        assert_eq!(account.id, "sa-9");
    }

    #[tokio::test]
    async fn test_authentication_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).list_accounts().await.unwrap_err();
        assert!(matches!(
            err,
            GitopsError::Account(AccountError::AuthenticationFailed { .. })
        ));
    }
}
