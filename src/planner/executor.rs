//! Plan executor for applying plans.
//!
//! Topic entries are applied to completion before any ACL entry. The first
//! failing cluster call stops the walk; earlier mutations stay in place.

use tracing::{error, info};

use crate::error::{GitopsError, KafkaError, PlanError, Result};
use crate::kafka::{ClusterClient, ConfigChange};

use super::plan::{AclPlan, DesiredPlan, PlanAction, PlanOptions, PlanOverview, TopicPlan};

/// Executor for plans.
#[derive(Debug)]
pub struct PlanExecutor<'a, C: ClusterClient + ?Sized> {
    /// Cluster to mutate.
    client: &'a C,
    /// Delete and skip switches.
    options: PlanOptions,
}

impl<'a, C: ClusterClient + ?Sized> PlanExecutor<'a, C> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(client: &'a C) -> Self {
        Self {
            client,
            options: PlanOptions {
                delete_disabled: false,
                skip_topics: false,
                skip_acls: false,
            },
        }
    }

    /// Sets the plan options.
    #[must_use]
    pub const fn with_options(mut self, options: PlanOptions) -> Self {
        self.options = options;
        self
    }

    /// Applies a plan and returns what was done.
    ///
    /// # Errors
    ///
    /// Returns [`KafkaError::Execution`] for the first failing cluster call.
    /// Nothing after that entry is attempted.
    pub async fn apply(&self, plan: &DesiredPlan) -> Result<PlanOverview> {
        let mut applied = PlanOverview::default();

        if !self.options.skip_topics {
            for topic_plan in &plan.topic_plans {
                if self.should_apply(topic_plan.action) {
                    self.apply_topic(topic_plan).await?;
                    count(&mut applied, topic_plan.action);
                }
            }
        }

        if !self.options.skip_acls {
            for acl_plan in &plan.acl_plans {
                if self.should_apply(acl_plan.action) {
                    self.apply_acl(acl_plan).await?;
                    count(&mut applied, acl_plan.action);
                }
            }
        }

        info!("[APPLY] Apply complete: {applied}");
        Ok(applied)
    }

    const fn should_apply(&self, action: PlanAction) -> bool {
        match action {
            PlanAction::NoChange => false,
            PlanAction::Remove => !self.options.delete_disabled,
            PlanAction::Add | PlanAction::Update => true,
        }
    }

    async fn apply_topic(&self, plan: &TopicPlan) -> Result<()> {
        info!("[APPLY] Applying: [{}] topic {}", plan.action, plan.name);

        match plan.action {
            PlanAction::Add => {
                let details = plan.topic_details.as_ref().ok_or_else(|| {
                    GitopsError::Plan(PlanError::InvalidPlan {
                        message: format!("ADD entry for topic {} has no topicDetails", plan.name),
                    })
                })?;
                self.client
                    .create_topic(&plan.name, details)
                    .await
                    .map_err(|e| execution_error(format!("Error creating topic {}", plan.name), e))
            }
            PlanAction::Update => {
                let changes: Vec<ConfigChange> = plan
                    .topic_config_plans
                    .iter()
                    .filter_map(|config| match config.action {
                        PlanAction::Add | PlanAction::Update => Some(ConfigChange {
                            key: config.key.clone(),
                            value: config.value.clone(),
                        }),
                        PlanAction::Remove => Some(ConfigChange::delete(&config.key)),
                        PlanAction::NoChange => None,
                    })
                    .collect();
                self.client
                    .alter_topic_config(&plan.name, &changes)
                    .await
                    .map_err(|e| execution_error(format!("Error updating topic {}", plan.name), e))
            }
            PlanAction::Remove => self
                .client
                .delete_topic(&plan.name)
                .await
                .map_err(|e| execution_error(format!("Error deleting topic {}", plan.name), e)),
            PlanAction::NoChange => Ok(()),
        }
    }

    async fn apply_acl(&self, plan: &AclPlan) -> Result<()> {
        info!("[APPLY] Applying: [{}] ACL {}", plan.action, plan.name);

        match plan.action {
            PlanAction::Add => self
                .client
                .create_acl(&plan.acl_details)
                .await
                .map_err(|e| execution_error(format!("Error creating ACL {}", plan.name), e)),
            PlanAction::Remove => self
                .client
                .delete_acl(&plan.acl_details)
                .await
                .map_err(|e| execution_error(format!("Error deleting ACL {}", plan.name), e)),
            PlanAction::Update | PlanAction::NoChange => Ok(()),
        }
    }
}

fn count(overview: &mut PlanOverview, action: PlanAction) {
    match action {
        PlanAction::Add => overview.add += 1,
        PlanAction::Update => overview.update += 1,
        PlanAction::Remove => overview.remove += 1,
        PlanAction::NoChange => {}
    }
}

/// Wraps a cluster failure, keeping the cluster-reported message as the cause.
fn execution_error(message: String, cause: GitopsError) -> GitopsError {
    error!("[APPLY] {message}: {cause}");
    let cause = match cause {
        GitopsError::Kafka(KafkaError::ApiRequestFailed { message, .. }) => message,
        other => other.to_string(),
    };
    KafkaError::execution(message, cause).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::{ClusterCall, InMemoryCluster};
    use crate::planner::TopicConfigPlan;
    use crate::state::{AclDetails, AclOperation, TopicDetails};

    fn topic(name: &str, action: PlanAction) -> TopicPlan {
        TopicPlan {
            name: name.to_string(),
            action,
            topic_details: Some(TopicDetails::new(1, 1)),
            topic_config_plans: vec![],
        }
    }

    fn acl(topic: &str, action: PlanAction) -> AclPlan {
        AclPlan {
            name: format!("svc-{topic}"),
            acl_details: AclDetails::topic(topic, "User:svc", AclOperation::Read),
            action,
        }
    }

    #[tokio::test]
    async fn test_topics_before_acls() {
        let cluster = InMemoryCluster::new().with_topic("old", TopicDetails::new(1, 1));
        let plan = DesiredPlan::new(
            vec![
                topic("new", PlanAction::Add),
                topic("same", PlanAction::NoChange),
                topic("old", PlanAction::Remove),
            ],
            vec![acl("new", PlanAction::Add)],
        );

        let applied = PlanExecutor::new(&cluster).apply(&plan).await.unwrap();

        assert_eq!(
            cluster.calls().await,
            vec![
                ClusterCall::CreateTopic(String::from("new")),
                ClusterCall::DeleteTopic(String::from("old")),
                ClusterCall::CreateAcl(AclDetails::topic("new", "User:svc", AclOperation::Read)),
            ]
        );
        assert_eq!(
            applied,
            PlanOverview {
                add: 2,
                update: 0,
                remove: 1
            }
        );
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_keys() {
        let cluster = InMemoryCluster::new().with_topic(
            "orders",
            TopicDetails::new(1, 1)
                .with_config("retention.ms", "1")
                .with_config("cleanup.policy", "compact"),
        );
        let mut update = topic("orders", PlanAction::Update);
        update.topic_config_plans = vec![
            TopicConfigPlan {
                key: String::from("cleanup.policy"),
                value: Some(String::from("compact")),
                action: PlanAction::NoChange,
            },
            TopicConfigPlan {
                key: String::from("max.message.bytes"),
                value: Some(String::from("2048")),
                action: PlanAction::Add,
            },
            TopicConfigPlan {
                key: String::from("retention.ms"),
                value: None,
                action: PlanAction::Remove,
            },
        ];

        PlanExecutor::new(&cluster)
            .apply(&DesiredPlan::new(vec![update], vec![]))
            .await
            .unwrap();

        assert_eq!(
            cluster.calls().await,
            vec![ClusterCall::AlterTopicConfig(
                String::from("orders"),
                vec![
                    ConfigChange::set("max.message.bytes", "2048"),
                    ConfigChange::delete("retention.ms"),
                ],
            )]
        );
        let configs = &cluster.topics().await["orders"].configs;
        assert_eq!(configs.get("max.message.bytes").map(String::as_str), Some("2048"));
        assert!(!configs.contains_key("retention.ms"));
    }

    #[tokio::test]
    async fn test_add_without_details_is_invalid() {
        let cluster = InMemoryCluster::new();
        let plan: DesiredPlan = serde_json::from_str(
            r#"{"topicPlans": [{"name": "orders", "action": "ADD"}], "aclPlans": []}"#,
        )
        .unwrap();

        let err = PlanExecutor::new(&cluster).apply(&plan).await.unwrap_err();
        assert!(matches!(err, GitopsError::Plan(PlanError::InvalidPlan { .. })));
        assert_eq!(err.to_string(), "Plan error: Invalid plan: ADD entry for topic orders has no topicDetails");
        assert!(cluster.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let cluster = InMemoryCluster::new().with_failure("b", "Topic authorization failed.");
        let plan = DesiredPlan::new(
            vec![
                topic("a", PlanAction::Add),
                topic("b", PlanAction::Add),
                topic("c", PlanAction::Add),
            ],
            vec![acl("a", PlanAction::Add)],
        );

        let err = PlanExecutor::new(&cluster).apply(&plan).await.unwrap_err();

        assert!(err.is_execution_error());
        assert_eq!(
            err.to_string(),
            "Kafka error: Error creating topic b: Topic authorization failed."
        );
        let topics = cluster.topics().await;
        assert!(topics.contains_key("a"));
        assert!(!topics.contains_key("c"));
        assert!(cluster.acls().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_disabled_and_skip_flags() {
        let existing = AclDetails::topic("x", "User:svc", AclOperation::Read);
        let cluster = InMemoryCluster::new()
            .with_topic("old", TopicDetails::new(1, 1))
            .with_acl(existing);
        let plan = DesiredPlan::new(
            vec![topic("old", PlanAction::Remove), topic("new", PlanAction::Add)],
            vec![acl("x", PlanAction::Remove)],
        );

        let applied = PlanExecutor::new(&cluster)
            .with_options(PlanOptions {
                delete_disabled: true,
                skip_topics: false,
                skip_acls: false,
            })
            .apply(&plan)
            .await
            .unwrap();
        assert_eq!(applied.total(), 1);
        assert!(cluster.topics().await.contains_key("old"));
        assert_eq!(cluster.acls().await.len(), 1);

        let cluster = InMemoryCluster::new();
        PlanExecutor::new(&cluster)
            .with_options(PlanOptions {
                delete_disabled: false,
                skip_topics: true,
                skip_acls: false,
            })
            .apply(&DesiredPlan::new(vec![topic("new", PlanAction::Add)], vec![]))
            .await
            .unwrap();
        assert!(cluster.calls().await.is_empty());
    }
}
