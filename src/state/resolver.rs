//! Desired state resolution.
//!
//! Turns a validated state file into a [`DesiredState`]: default replication
//! is applied, principals are resolved, services and users are expanded
//! into access entries keyed `<owner>-<index>`, and topic prefix rules are
//! collected.

use std::collections::BTreeMap;
use tracing::{debug, info};

use super::desired::DesiredState;
use super::expand::{ExpandOptions, expand_service};
use super::roles::RoleTable;
use super::types::{AclDetails, TopicDetails};
use crate::accounts::{AccountDirectory, ServiceAccount, user_account_name};
use crate::config::{ConfigValidator, CustomAclDetails, DesiredStateFile};
use crate::error::{ConfigError, GitopsError, Result};

/// Resolves state files into desired states.
pub struct StateResolver<'a> {
    roles: RoleTable,
    accounts: Option<&'a dyn AccountDirectory>,
}

impl std::fmt::Debug for StateResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateResolver")
            .field("roles", &self.roles.names())
            .field("accounts", &self.accounts.is_some())
            .finish()
    }
}

impl Default for StateResolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Assigns `<owner>-<index>` keys in emission order.
struct KeyedAcls<'s> {
    owner: &'s str,
    next: usize,
    acls: &'s mut Vec<(String, AclDetails)>,
}

impl KeyedAcls<'_> {
    fn push(&mut self, acl: AclDetails) {
        self.acls.push((format!("{}-{}", self.owner, self.next), acl));
        self.next += 1;
    }
}

impl<'a> StateResolver<'a> {
    /// Creates a resolver with the built-in roles and no account directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            roles: RoleTable::new(),
            accounts: None,
        }
    }

    /// Uses an account directory when identity provisioning is enabled.
    #[must_use]
    pub fn with_accounts(mut self, accounts: &'a dyn AccountDirectory) -> Self {
        self.accounts = Some(accounts);
        self
    }

    /// Validates and resolves a state file.
    ///
    /// # Errors
    ///
    /// Returns a validation error, a missing configuration error or an
    /// account lookup error. No partial state is returned.
    pub async fn resolve(&self, file: &DesiredStateFile) -> Result<DesiredState> {
        ConfigValidator::with_roles(self.roles.clone()).validate(file)?;

        let accounts = if file.is_cloud_enabled() {
            let directory = self.accounts.ok_or_else(|| {
                ConfigError::missing("Confluent Cloud is enabled but no account directory is configured")
            })?;
            Some(directory.list_accounts().await?)
        } else {
            None
        };

        let mut state = DesiredState {
            topics: Self::resolve_topics(file),
            ..DesiredState::default()
        };

        for (name, service) in &file.services {
            let principal = match &accounts {
                Some(accounts) => Some(account_principal(accounts, name)?),
                None => service.principal().map(str::to_string),
            };
            let generated = expand_service(
                service,
                principal.as_deref().unwrap_or_default(),
                ExpandOptions {
                    service_name: name,
                    describe_acl_enabled: file.is_describe_acl_enabled(),
                },
            );
            if principal.is_none() && !generated.is_empty() {
                return Err(ConfigError::missing(format!("Missing principal for service {name}")).into());
            }

            let mut keyed = KeyedAcls {
                owner: name,
                next: 0,
                acls: &mut state.acls,
            };
            for acl in generated {
                keyed.push(acl);
            }
            Self::append_custom(
                &mut keyed,
                file.custom_service_acls.get(name),
                principal.as_deref(),
                "custom service ACL",
            )?;
        }

        for (name, user) in &file.users {
            let principal = match &accounts {
                Some(accounts) => account_principal(accounts, &user_account_name(name))?,
                None => user.principal.clone().ok_or_else(|| {
                    ConfigError::missing(format!("Missing principal for user {name}"))
                })?,
            };

            let mut keyed = KeyedAcls {
                owner: name,
                next: 0,
                acls: &mut state.acls,
            };
            for role in &user.roles {
                let acls = self.roles.expand(role, &principal).ok_or_else(|| {
                    ConfigError::validation(
                        format!("Unknown role '{role}' for user '{name}'"),
                        format!("users -> {name} -> roles"),
                    )
                })?;
                for acl in acls {
                    keyed.push(acl);
                }
            }
            Self::append_custom(
                &mut keyed,
                file.custom_user_acls.get(name),
                Some(&principal),
                "custom user ACL",
            )?;
        }

        state.prefixed_topics_to_ignore = file.blacklist_prefixes().to_vec();
        state.prefixed_topics_to_ignore.extend(
            file.services
                .iter()
                .filter(|(_, service)| service.owns_internal_topics())
                .map(|(name, _)| name.clone()),
        );
        state.prefixed_topics_to_accept = file.whitelist_prefixes().to_vec();

        info!(
            "Resolved desired state: {} topics, {} ACLs",
            state.topics.len(),
            state.acls.len()
        );
        Ok(state)
    }

    fn resolve_topics(file: &DesiredStateFile) -> BTreeMap<String, TopicDetails> {
        let default_replication = file.default_replication();
        file.topics
            .iter()
            .map(|(name, topic)| {
                let mut topic = topic.clone();
                if topic.replication.is_none() {
                    debug!("Applying default replication to topic {name}");
                    topic.replication = default_replication;
                }
                (name.clone(), topic)
            })
            .collect()
    }

    fn append_custom(
        keyed: &mut KeyedAcls<'_>,
        custom: Option<&BTreeMap<String, CustomAclDetails>>,
        owner_principal: Option<&str>,
        kind: &str,
    ) -> Result<()> {
        for (acl_name, details) in custom.into_iter().flatten() {
            let principal = match (&details.principal, owner_principal) {
                (Some(_), _) => "",
                (None, Some(principal)) => principal,
                (None, None) => {
                    return Err(ConfigError::missing(format!("Missing principal for {kind} {acl_name}")).into());
                }
            };
            keyed.push(details.to_acl_details(principal)?);
        }
        Ok(())
    }
}

fn account_principal(accounts: &[ServiceAccount], name: &str) -> Result<String> {
    accounts
        .iter()
        .find(|account| account.name == name)
        .map(ServiceAccount::principal)
        .ok_or_else(|| {
            GitopsError::Config(ConfigError::ServiceAccountNotFound {
                name: name.to_string(),
            })
        })
}
