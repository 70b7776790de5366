//! State manager tying the pipeline together.
//!
//! Each command runs strictly in sequence: resolve the declared state, take
//! one cluster snapshot, diff, optionally persist the plan, then apply.

use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::accounts::{AccountDirectory, user_account_name};
use crate::config::{ConfigHasher, DesiredStateFile};
use crate::error::{ConfigError, GitopsError, Result};
use crate::kafka::{ClusterClient, ClusterSnapshot};
use crate::planner::{
    DesiredPlan, DiffEngine, PlanExecutor, PlanOptions, PlanOverview, PlanStatus, PlanStore,
};
use crate::state::StateResolver;

/// Result of a plan run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PlanOutcome {
    /// The full plan, unchanged entries included.
    pub plan: DesiredPlan,
    /// Counts of what would be applied.
    pub overview: PlanOverview,
}

/// Result of an apply run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApplyOutcome {
    /// The plan that was applied.
    pub plan: DesiredPlan,
    /// Counts of what was applied; empty when the cluster was up to date.
    pub applied: PlanOverview,
}

impl PlanOutcome {
    /// Returns the has-changes status.
    #[must_use]
    pub const fn status(&self) -> PlanStatus {
        if self.overview.is_empty() {
            PlanStatus::UpToDate
        } else {
            PlanStatus::HasChanges(self.overview)
        }
    }
}

/// Orchestrates plan, apply and account provisioning.
pub struct StateManager<'a, C: ClusterClient + ?Sized, S: PlanStore + ?Sized> {
    /// Declared state.
    state: &'a DesiredStateFile,
    /// Cluster backend.
    client: &'a C,
    /// Plan persistence.
    store: &'a S,
    /// Account directory, used when identity provisioning is on.
    accounts: Option<&'a dyn AccountDirectory>,
    /// Delete and skip switches.
    options: PlanOptions,
    /// State fingerprinting.
    hasher: ConfigHasher,
}

impl<'a, C: ClusterClient + ?Sized, S: PlanStore + ?Sized> StateManager<'a, C, S> {
    /// Creates a new state manager.
    #[must_use]
    pub const fn new(state: &'a DesiredStateFile, client: &'a C, store: &'a S) -> Self {
        Self {
            state,
            client,
            store,
            accounts: None,
            options: PlanOptions {
                delete_disabled: false,
                skip_topics: false,
                skip_acls: false,
            },
            hasher: ConfigHasher::new(),
        }
    }

    /// Sets the plan options.
    #[must_use]
    pub const fn with_options(mut self, options: PlanOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the account directory.
    #[must_use]
    pub fn with_accounts(mut self, accounts: &'a dyn AccountDirectory) -> Self {
        self.accounts = Some(accounts);
        self
    }

    /// Generates a plan and writes it to the plan store.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution, the snapshot or the plan write fails.
    pub async fn plan(&self) -> Result<PlanOutcome> {
        let plan = self.generate_plan().await?;
        self.store.write(&plan).await?;

        let overview = plan.overview(self.options);
        match plan.status(self.options) {
            PlanStatus::UpToDate => info!("Plan is up to date"),
            PlanStatus::HasChanges(changes) => info!("Plan: {changes}"),
        }
        Ok(PlanOutcome { plan, overview })
    }

    /// Applies the stored plan, or a freshly generated one when none is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan cannot be loaded or generated, or the
    /// first cluster execution error.
    pub async fn apply(&self) -> Result<ApplyOutcome> {
        let pending = self.pending_plan().await?;
        self.apply_plan(pending.plan).await
    }

    /// Loads the plan an apply would execute without touching the cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored plan cannot be read, or if generating
    /// a fresh plan fails.
    pub async fn pending_plan(&self) -> Result<PlanOutcome> {
        let plan = match self.store.read().await? {
            Some(plan) => {
                self.check_fingerprint(&plan)?;
                plan
            }
            None => self.generate_plan().await?,
        };
        let overview = plan.overview(self.options);
        Ok(PlanOutcome { plan, overview })
    }

    /// Applies the given plan.
    ///
    /// # Errors
    ///
    /// Returns the first cluster execution error.
    pub async fn apply_plan(&self, plan: DesiredPlan) -> Result<ApplyOutcome> {
        if plan.status(self.options) == PlanStatus::UpToDate {
            info!("Nothing to apply; the cluster matches the desired state");
            return Ok(ApplyOutcome {
                plan,
                applied: PlanOverview::default(),
            });
        }

        let applied = PlanExecutor::new(self.client)
            .with_options(self.options)
            .apply(&plan)
            .await?;
        Ok(ApplyOutcome { plan, applied })
    }

    /// Creates every missing service and user account.
    ///
    /// # Errors
    ///
    /// See [`create_accounts`].
    pub async fn create_accounts(&self) -> Result<usize> {
        create_accounts(self.state, self.accounts).await
    }

    async fn generate_plan(&self) -> Result<DesiredPlan> {
        let mut resolver = StateResolver::new();
        if let Some(accounts) = self.accounts {
            resolver = resolver.with_accounts(accounts);
        }
        let desired = resolver.resolve(self.state).await?;

        info!("Fetching cluster snapshot from {} backend", self.client.backend_type());
        let snapshot =
            ClusterSnapshot::fetch(self.client, self.options.skip_topics, self.options.skip_acls)
                .await?;

        let hash = self.hasher.hash_state(self.state)?;
        Ok(DiffEngine::new(self.options)
            .plan(&desired, &snapshot)
            .with_metadata(Utc::now(), hash))
    }

    fn check_fingerprint(&self, plan: &DesiredPlan) -> Result<()> {
        let Some(recorded) = &plan.state_hash else {
            return Ok(());
        };
        let current = self.hasher.hash_state(self.state)?;
        if !ConfigHasher::hashes_match(recorded, &current) {
            warn!(
                "The plan was generated from a different state file ({} vs {}); applying it as-is",
                self.hasher.short_hash(recorded),
                self.hasher.short_hash(&current)
            );
        }
        Ok(())
    }
}

/// Creates every missing service and user account.
///
/// Accounts are listed once; services map to accounts of the same name and
/// users to `user-<name>`. Returns the number of accounts created.
///
/// # Errors
///
/// Returns [`ConfigError::CloudNotEnabled`] when identity provisioning is
/// off, a missing configuration error when no directory is given, or an
/// account directory error.
pub async fn create_accounts(
    state: &DesiredStateFile,
    directory: Option<&dyn AccountDirectory>,
) -> Result<usize> {
    if !state.is_cloud_enabled() {
        return Err(GitopsError::Config(ConfigError::CloudNotEnabled));
    }
    let directory = directory.ok_or_else(|| {
        ConfigError::missing("Confluent Cloud is enabled but no account directory is configured")
    })?;

    let existing: BTreeSet<String> = directory
        .list_accounts()
        .await?
        .into_iter()
        .map(|account| account.name)
        .collect();

    let wanted = state
        .services
        .keys()
        .map(|name| (name.clone(), false))
        .chain(state.users.keys().map(|name| (user_account_name(name), true)));

    let mut created = 0;
    for (name, is_user) in wanted {
        if existing.contains(&name) {
            debug!("Account {name} already exists");
            continue;
        }
        directory.create_account(&name, is_user).await?;
        info!("Created account {name}");
        created += 1;
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{MockAccountDirectory, ServiceAccount};
    use crate::config::ConfigParser;
    use crate::kafka::InMemoryCluster;
    use crate::planner::{LocalPlanStore, PlanAction};
    use crate::state::{AclDetails, AclOperation, TopicDetails};
    use tempfile::TempDir;

    const STATE: &str = r"
settings:
  topics:
    defaults:
      replication: 1
topics:
  orders:
    partitions: 3
    configs:
      cleanup.policy: compact
  payments:
    partitions: 1
services:
  billing:
    type: application
    principal: User:billing
    produces: [payments]
    consumes: [orders]
users:
  alice:
    principal: User:alice
    roles: [reader]
";

    fn parse(yaml: &str) -> DesiredStateFile {
        ConfigParser::new().parse_yaml(yaml, None).unwrap()
    }

    #[tokio::test]
    async fn test_apply_then_plan_is_up_to_date() {
        let state = parse(STATE);
        let cluster = InMemoryCluster::new().with_broker_default("retention.ms", "604800000");
        let store = LocalPlanStore::disabled();
        let manager = StateManager::new(&state, &cluster, &store);

        let first = manager.plan().await.unwrap();
        assert!(matches!(first.status(), PlanStatus::HasChanges(_)));

        let applied = manager.apply().await.unwrap().applied;
        assert_eq!(applied.add, first.overview.add);
        assert_eq!(cluster.topics().await["orders"].configs["cleanup.policy"], "compact");

        let second = manager.plan().await.unwrap();
        assert_eq!(second.status(), PlanStatus::UpToDate);
        assert!(
            second
                .plan
                .topic_plans
                .iter()
                .all(|p| p.action == PlanAction::NoChange)
        );
    }

    #[tokio::test]
    async fn test_delete_disabled_keeps_extra_resources() {
        let state = parse(STATE);
        let stray = AclDetails::topic("legacy", "User:old", AclOperation::Read);
        let cluster = InMemoryCluster::new()
            .with_topic("legacy", TopicDetails::new(1, 1))
            .with_acl(stray.clone());
        let store = LocalPlanStore::disabled();
        let options = PlanOptions {
            delete_disabled: true,
            ..PlanOptions::default()
        };
        let manager = StateManager::new(&state, &cluster, &store).with_options(options);

        let outcome = manager.plan().await.unwrap();
        assert_eq!(outcome.overview.remove, 0);

        manager.apply().await.unwrap();
        assert!(cluster.topics().await.contains_key("legacy"));
        assert!(cluster.acls().await.contains(&stray));

        let outcome = manager.plan().await.unwrap();
        assert_eq!(outcome.status(), PlanStatus::UpToDate);
    }

    #[tokio::test]
    async fn test_apply_stored_plan() {
        let temp = TempDir::new().unwrap();
        let state = parse(STATE);
        let cluster = InMemoryCluster::new();
        let store = LocalPlanStore::new(temp.path().join("plan.json"));

        let manager = StateManager::new(&state, &cluster, &store);
        manager.plan().await.unwrap();

        // A changed state file only warns; the stored plan is applied as-is.
        let changed = parse(&STATE.replace("partitions: 3", "partitions: 6"));
        let applied = StateManager::new(&changed, &cluster, &store)
            .apply()
            .await
            .unwrap();

        assert!(applied.applied.add > 0);
        assert_eq!(cluster.topics().await["orders"].partitions, 3);
    }

    #[tokio::test]
    async fn test_apply_stops_on_failure() {
        let state = parse(STATE);
        let cluster = InMemoryCluster::new().with_failure("payments", "Authorization failed.");
        let store = LocalPlanStore::disabled();

        let err = StateManager::new(&state, &cluster, &store)
            .apply()
            .await
            .unwrap_err();

        assert!(err.is_execution_error());
        assert!(cluster.topics().await.contains_key("orders"));
        assert!(cluster.acls().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_accounts_requires_cloud() {
        let state = parse(STATE);
        let cluster = InMemoryCluster::new();
        let store = LocalPlanStore::disabled();

        let err = StateManager::new(&state, &cluster, &store)
            .create_accounts()
            .await
            .unwrap_err();
        assert!(matches!(err, GitopsError::Config(ConfigError::CloudNotEnabled)));
    }

    #[tokio::test]
    async fn test_create_missing_accounts() {
        let state = parse(
            r"
settings:
  ccloud:
    enabled: true
services:
  billing:
    type: application
  shipping:
    type: application
users:
  alice:
    roles: [reader]
",
        );
        let mut directory = MockAccountDirectory::new();
        directory.expect_list_accounts().times(1).returning(|| {
            Ok(vec![ServiceAccount {
                id: String::from("sa-1"),
                name: String::from("billing"),
            }])
        });
        directory
            .expect_create_account()
            .times(2)
            .returning(|name, _| {
                Ok(ServiceAccount {
                    id: format!("sa-{name}"),
                    name: name.to_string(),
                })
            });

        let cluster = InMemoryCluster::new();
        let store = LocalPlanStore::disabled();
        let created = StateManager::new(&state, &cluster, &store)
            .with_accounts(&directory)
            .create_accounts()
            .await
            .unwrap();
        assert_eq!(created, 2);
    }
}
