//! Account directory integration.
//!
//! When identity provisioning is enabled, principals are not declared in the
//! state file. Each service maps to an account of the same name and each user
//! to an account named `user-<name>`; the principal is `User:<account id>`.

mod confluent;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use confluent::ConfluentCloudClient;

/// An account in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccount {
    /// Directory-assigned id.
    pub id: String,
    /// Account name.
    pub name: String,
}

impl ServiceAccount {
    /// Returns the principal bound to this account.
    #[must_use]
    pub fn principal(&self) -> String {
        principal_for(&self.id)
    }
}

/// Returns the principal for an account id.
#[must_use]
pub fn principal_for(account_id: &str) -> String {
    format!("User:{account_id}")
}

/// Returns the account name expected for a user.
#[must_use]
pub fn user_account_name(user: &str) -> String {
    format!("user-{user}")
}

/// Trait for account directories.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Lists every account.
    async fn list_accounts(&self) -> Result<Vec<ServiceAccount>>;

    /// Creates an account.
    async fn create_account(&self, name: &str, is_user: bool) -> Result<ServiceAccount>;
}

#[async_trait]
impl AccountDirectory for Box<dyn AccountDirectory> {
    async fn list_accounts(&self) -> Result<Vec<ServiceAccount>> {
        (**self).list_accounts().await
    }

    async fn create_account(&self, name: &str, is_user: bool) -> Result<ServiceAccount> {
        (**self).create_account(name, is_user).await
    }
}
