//! Plan persistence.
//!
//! A plan written by `plan --out` is read back verbatim by `apply --plan`.
//! When no location is configured nothing is written and reads yield
//! `None`, which makes the caller plan afresh.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{GitopsError, PlanError, Result};

use super::plan::DesiredPlan;

/// Trait for plan storage backends.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Reads the stored plan, or `None` if no location is configured.
    async fn read(&self) -> Result<Option<DesiredPlan>>;

    /// Writes the plan, replacing any existing one.
    async fn write(&self, plan: &DesiredPlan) -> Result<()>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl PlanStore for Box<dyn PlanStore> {
    async fn read(&self) -> Result<Option<DesiredPlan>> {
        (**self).read().await
    }

    async fn write(&self, plan: &DesiredPlan) -> Result<()> {
        (**self).write(plan).await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}

/// Plan store backed by a local JSON file.
#[derive(Debug, Default)]
pub struct LocalPlanStore {
    /// Plan file, if configured.
    path: Option<PathBuf>,
    /// Keep NO_CHANGE entries when writing.
    include_unchanged: bool,
}

impl LocalPlanStore {
    /// Creates a store for the given plan file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            include_unchanged: false,
        }
    }

    /// Creates a store with no location; reads yield `None` and writes are skipped.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            path: None,
            include_unchanged: false,
        }
    }

    /// Creates a store from an optional plan file.
    #[must_use]
    pub fn from_option(path: Option<PathBuf>) -> Self {
        Self {
            path,
            include_unchanged: false,
        }
    }

    /// Keeps NO_CHANGE entries in written plans.
    #[must_use]
    pub const fn with_include_unchanged(mut self, include_unchanged: bool) -> Self {
        self.include_unchanged = include_unchanged;
        self
    }

    /// Returns the configured plan file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn write_to(&self, path: &Path, plan: &DesiredPlan) -> Result<()> {
        if path.exists() {
            info!("Overwriting existing plan file at {}", path.display());
        }

        let output = if self.include_unchanged {
            plan.clone()
        } else {
            plan.to_changes_only()
        };

        let content = serde_json::to_string_pretty(&output)
            .map_err(|e| write_error(format!("Failed to serialize plan: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty())
            && !parent.exists()
        {
            debug!("Creating plan directory: {}", parent.display());
            fs::create_dir_all(parent)
                .await
                .map_err(|e| write_error(format!("Failed to create plan directory: {e}")))?;
        }

        // Write to a temporary file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| write_error(format!("Failed to create temp plan file: {e}")))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| write_error(format!("Failed to write plan file: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| write_error(format!("Failed to sync plan file: {e}")))?;

        fs::rename(&temp_path, path)
            .await
            .map_err(|e| write_error(format!("Failed to rename plan file: {e}")))?;

        debug!("Plan saved successfully");
        Ok(())
    }
}

fn write_error(message: String) -> GitopsError {
    GitopsError::Plan(PlanError::WritePlanOutput { message })
}

#[async_trait]
impl PlanStore for LocalPlanStore {
    async fn read(&self) -> Result<Option<DesiredPlan>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        info!("Reading plan from: {}", path.display());

        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GitopsError::Plan(PlanError::PlanFileNotFound { path: path.clone() }));
            }
            Err(e) => {
                return Err(GitopsError::Plan(PlanError::ReadPlanInput {
                    message: format!("Failed to read plan file: {e}"),
                }));
            }
        };

        let plan: DesiredPlan = serde_json::from_str(&content).map_err(|e| {
            GitopsError::Plan(PlanError::ReadPlanInput {
                message: format!("Failed to parse plan file: {e}"),
            })
        })?;

        Ok(Some(plan))
    }

    async fn write(&self, plan: &DesiredPlan) -> Result<()> {
        match &self.path {
            Some(path) => self.write_to(path, plan).await,
            None => Ok(()),
        }
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{AclPlan, PlanAction, TopicPlan};
    use crate::state::{AclDetails, AclOperation, TopicDetails};
    use tempfile::TempDir;

    fn sample_plan() -> DesiredPlan {
        DesiredPlan::new(
            vec![
                TopicPlan {
                    name: String::from("orders"),
                    action: PlanAction::Add,
                    topic_details: Some(TopicDetails::new(3, 3).with_config("retention.ms", "1000")),
                    topic_config_plans: vec![],
                },
                TopicPlan {
                    name: String::from("payments"),
                    action: PlanAction::NoChange,
                    topic_details: Some(TopicDetails::new(1, 1)),
                    topic_config_plans: vec![],
                },
            ],
            vec![AclPlan {
                name: String::from("svc-0"),
                acl_details: AclDetails::topic("orders", "User:svc", AclOperation::Write),
                action: PlanAction::NoChange,
            }],
        )
        .with_metadata(chrono::Utc::now(), "abc")
    }

    #[tokio::test]
    async fn test_full_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = LocalPlanStore::new(temp.path().join("plan.json")).with_include_unchanged(true);
        let plan = sample_plan();

        store.write(&plan).await.unwrap();
        let loaded = store.read().await.unwrap().unwrap();

        assert_eq!(loaded, plan);
    }

    #[tokio::test]
    async fn test_changes_only_by_default() {
        let temp = TempDir::new().unwrap();
        let store = LocalPlanStore::new(temp.path().join("plans/plan.json"));

        store.write(&sample_plan()).await.unwrap();
        let loaded = store.read().await.unwrap().unwrap();

        assert_eq!(loaded.topic_plans.len(), 1);
        assert_eq!(loaded.topic_plans[0].name, "orders");
        assert!(loaded.acl_plans.is_empty());
        assert_eq!(loaded.state_hash.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_overwrite() {
        let temp = TempDir::new().unwrap();
        let store = LocalPlanStore::new(temp.path().join("plan.json"));

        store.write(&sample_plan()).await.unwrap();
        store.write(&DesiredPlan::default()).await.unwrap();

        let loaded = store.read().await.unwrap().unwrap();
        assert!(loaded.topic_plans.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_distinct_error() {
        let temp = TempDir::new().unwrap();
        let store = LocalPlanStore::new(temp.path().join("missing.json"));

        let result = store.read().await;
        assert!(matches!(
            result,
            Err(GitopsError::Plan(PlanError::PlanFileNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plan.json");
        std::fs::write(&path, "not json").unwrap();

        let result = LocalPlanStore::new(path).read().await;
        assert!(matches!(
            result,
            Err(GitopsError::Plan(PlanError::ReadPlanInput { .. }))
        ));
    }

    #[tokio::test]
    async fn test_disabled_store() {
        let store = LocalPlanStore::disabled();
        assert!(store.read().await.unwrap().is_none());
        store.write(&sample_plan()).await.unwrap();
        assert!(store.path().is_none());
    }
}
