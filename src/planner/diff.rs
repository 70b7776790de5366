//! Diff engine for comparing the desired state with a cluster snapshot.
//!
//! Both diffs are pure functions of their inputs. Topic identity is the
//! name; ACL identity is the full binding, never the desired-state key.

use std::collections::BTreeMap;
use tracing::info;

use crate::kafka::{ClusterSnapshot, ConfigEntry};
use crate::state::{DesiredState, TopicDetails};

use super::plan::{AclPlan, DesiredPlan, PlanAction, PlanOptions, TopicConfigPlan, TopicPlan};

/// Label for cluster ACLs that match no desired entry.
pub const UNNAMED_ACL: &str = "Unnamed ACL";

/// Engine for computing plans.
#[derive(Debug, Default)]
pub struct DiffEngine {
    /// Planning options.
    options: PlanOptions,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new(options: PlanOptions) -> Self {
        Self { options }
    }

    /// Computes the full plan, leaving out skipped resource kinds.
    #[must_use]
    pub fn plan(&self, desired: &DesiredState, snapshot: &ClusterSnapshot) -> DesiredPlan {
        let topic_plans = if self.options.skip_topics {
            Vec::new()
        } else {
            self.plan_topics(desired, snapshot)
        };
        let acl_plans = if self.options.skip_acls {
            Vec::new()
        } else {
            self.plan_acls(desired, snapshot)
        };
        DesiredPlan::new(topic_plans, acl_plans)
    }

    /// Computes topic actions.
    ///
    /// Desired topics come first in name order, followed by removals in
    /// cluster listing order.
    #[must_use]
    pub fn plan_topics(&self, desired: &DesiredState, snapshot: &ClusterSnapshot) -> Vec<TopicPlan> {
        let mut plans = Vec::new();

        for (name, details) in &desired.topics {
            let plan = if snapshot.has_topic(name) {
                info!("[PLAN] Topic {name} exists, it will not be created.");
                Self::plan_existing_topic(name, details, snapshot.topic_configs(name))
            } else {
                info!("[PLAN] Topic {name} does not exist; it will be created.");
                TopicPlan {
                    name: name.clone(),
                    action: PlanAction::Add,
                    topic_details: Some(details.clone()),
                    topic_config_plans: Vec::new(),
                }
            };
            plans.push(plan);
        }

        for name in &snapshot.topics {
            if !desired.is_accepted(name) {
                info!("[PLAN] Ignoring topic {name} due to missing prefix (whitelist)");
                continue;
            }
            if desired.is_ignored(name) {
                info!("[PLAN] Ignoring topic {name} due to prefix (blacklist)");
                continue;
            }
            if self.options.delete_disabled || desired.topics.contains_key(name) {
                continue;
            }

            info!("[PLAN] Topic {name} is not in the desired state; it will be deleted.");
            plans.push(TopicPlan {
                name: name.clone(),
                action: PlanAction::Remove,
                topic_details: None,
                topic_config_plans: Vec::new(),
            });
        }

        plans
    }

    /// Diffs the configs of a topic that already exists.
    ///
    /// Only values set directly on the topic are compared; broker and
    /// default values are never removed.
    fn plan_existing_topic(name: &str, details: &TopicDetails, configs: &[ConfigEntry]) -> TopicPlan {
        let mut action = PlanAction::NoChange;
        let mut config_plans: BTreeMap<&str, TopicConfigPlan> = BTreeMap::new();

        let current: Vec<&ConfigEntry> = configs
            .iter()
            .filter(|entry| entry.is_dynamic_topic_config())
            .collect();

        for entry in &current {
            let wanted = details.configs.get(&entry.name);
            if entry.value.as_ref() == wanted {
                config_plans.insert(
                    &entry.name,
                    TopicConfigPlan {
                        key: entry.name.clone(),
                        value: entry.value.clone(),
                        action: PlanAction::NoChange,
                    },
                );
            } else if wanted.is_none() {
                config_plans.insert(
                    &entry.name,
                    TopicConfigPlan {
                        key: entry.name.clone(),
                        value: None,
                        action: PlanAction::Remove,
                    },
                );
                action = PlanAction::Update;
            }
        }

        for (key, value) in &details.configs {
            let sub_action = match current.iter().find(|entry| &entry.name == key) {
                None => PlanAction::Add,
                Some(entry) if entry.value.as_ref() != Some(value) => PlanAction::Update,
                Some(_) => continue,
            };
            config_plans.insert(
                key,
                TopicConfigPlan {
                    key: key.clone(),
                    value: Some(value.clone()),
                    action: sub_action,
                },
            );
            action = PlanAction::Update;
        }

        for plan in config_plans.values() {
            info!("[PLAN] Topic {name} | [{}] {}", plan.action, plan.key);
        }

        TopicPlan {
            name: name.to_string(),
            action,
            topic_details: Some(details.clone()),
            topic_config_plans: config_plans.into_values().collect(),
        }
    }

    /// Computes ACL actions.
    ///
    /// Cluster entries come first in listing order (NO_CHANGE or REMOVE),
    /// followed by additions in emission order.
    #[must_use]
    pub fn plan_acls(&self, desired: &DesiredState, snapshot: &ClusterSnapshot) -> Vec<AclPlan> {
        let mut plans = Vec::new();

        for current in &snapshot.acls {
            match desired.acls.iter().find(|(_, acl)| acl == current) {
                Some((key, acl)) => plans.push(AclPlan {
                    name: key.clone(),
                    acl_details: acl.clone(),
                    action: PlanAction::NoChange,
                }),
                None if self.options.delete_disabled => {}
                None => {
                    info!("[PLAN] ACL {current} is not in the desired state; it will be deleted.");
                    plans.push(AclPlan {
                        name: String::from(UNNAMED_ACL),
                        acl_details: current.clone(),
                        action: PlanAction::Remove,
                    });
                }
            }
        }

        for (key, acl) in &desired.acls {
            if !snapshot.acls.contains(acl) {
                info!("[PLAN] ACL {key} does not exist; it will be created.");
                plans.push(AclPlan {
                    name: key.clone(),
                    acl_details: acl.clone(),
                    action: PlanAction::Add,
                });
            }
        }

        plans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::ConfigSource;
    use crate::state::{AclDetails, AclOperation};

    fn snapshot_with_topic(name: &str, configs: Vec<ConfigEntry>) -> ClusterSnapshot {
        let mut snapshot = ClusterSnapshot::default();
        snapshot.topics.push(name.to_string());
        snapshot.configs.insert(name.to_string(), configs);
        snapshot
    }

    fn desired_with_topic(name: &str, details: TopicDetails) -> DesiredState {
        let mut desired = DesiredState::default();
        desired.topics.insert(name.to_string(), details);
        desired
    }

    fn engine() -> DiffEngine {
        DiffEngine::new(PlanOptions::default())
    }

    #[test]
    fn test_missing_topic_is_added() {
        let desired = desired_with_topic("orders", TopicDetails::new(3, 3));
        let plans = engine().plan_topics(&desired, &ClusterSnapshot::default());
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].action, PlanAction::Add);
        assert!(plans[0].topic_config_plans.is_empty());
    }

    #[test]
    fn test_config_drift() {
        let desired = desired_with_topic(
            "orders",
            TopicDetails::new(3, 3)
                .with_config("cleanup.policy", "compact")
                .with_config("retention.ms", "2000")
                .with_config("segment.ms", "10"),
        );
        let snapshot = snapshot_with_topic(
            "orders",
            vec![
                ConfigEntry::dynamic("cleanup.policy", "compact"),
                ConfigEntry::dynamic("retention.ms", "1000"),
                ConfigEntry::dynamic("min.insync.replicas", "2"),
            ],
        );

        let plans = engine().plan_topics(&desired, &snapshot);
        assert_eq!(plans[0].action, PlanAction::Update);

        let sub: Vec<(&str, PlanAction)> = plans[0]
            .topic_config_plans
            .iter()
            .map(|c| (c.key.as_str(), c.action))
            .collect();
        assert_eq!(
            sub,
            vec![
                ("cleanup.policy", PlanAction::NoChange),
                ("min.insync.replicas", PlanAction::Remove),
                ("retention.ms", PlanAction::Update),
                ("segment.ms", PlanAction::Add),
            ]
        );
    }

    #[test]
    fn test_only_dynamic_topic_configs_compared() {
        let desired = desired_with_topic("orders", TopicDetails::new(3, 3));
        let snapshot = snapshot_with_topic(
            "orders",
            vec![ConfigEntry {
                name: String::from("retention.ms"),
                value: Some(String::from("604800000")),
                source: ConfigSource::DynamicDefaultBrokerConfig,
            }],
        );

        let plans = engine().plan_topics(&desired, &snapshot);
        assert_eq!(plans[0].action, PlanAction::NoChange);
        assert!(plans[0].topic_config_plans.is_empty());
    }

    #[test]
    fn test_desired_config_over_broker_default_is_added() {
        let desired = desired_with_topic(
            "orders",
            TopicDetails::new(3, 3).with_config("retention.ms", "604800000"),
        );
        let snapshot = snapshot_with_topic(
            "orders",
            vec![ConfigEntry {
                name: String::from("retention.ms"),
                value: Some(String::from("604800000")),
                source: ConfigSource::DefaultConfig,
            }],
        );

        let plans = engine().plan_topics(&desired, &snapshot);
        assert_eq!(plans[0].action, PlanAction::Update);
        assert_eq!(plans[0].topic_config_plans[0].action, PlanAction::Add);
    }

    #[test]
    fn test_prefix_filtering() {
        let snapshot = snapshot_with_topic("teamA.logs", vec![]);

        let mut desired = DesiredState::default();
        desired.prefixed_topics_to_accept.push(String::from("teamA."));
        // Accepted but absent from the desired state.
        assert_eq!(
            engine().plan_topics(&desired, &snapshot)[0].action,
            PlanAction::Remove
        );

        let mut desired = DesiredState::default();
        desired.prefixed_topics_to_accept.push(String::from("teamB."));
        assert!(engine().plan_topics(&desired, &snapshot).is_empty());

        let mut desired = DesiredState::default();
        desired.prefixed_topics_to_ignore.push(String::from("teamA."));
        assert!(engine().plan_topics(&desired, &snapshot).is_empty());

        let desired = DesiredState::default();
        let plans = engine().plan_topics(&desired, &snapshot);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].action, PlanAction::Remove);
        assert!(plans[0].topic_details.is_none());
    }

    #[test]
    fn test_delete_disabled_omits_removals() {
        let acl = AclDetails::topic("orders", "User:old", AclOperation::Read);
        let mut snapshot = snapshot_with_topic("legacy", vec![]);
        snapshot.acls.push(acl);

        let engine = DiffEngine::new(PlanOptions {
            delete_disabled: true,
            ..PlanOptions::default()
        });
        let plan = engine.plan(&DesiredState::default(), &snapshot);
        assert!(plan.topic_plans.is_empty());
        assert!(plan.acl_plans.is_empty());
    }

    #[test]
    fn test_acl_identity_is_structural() {
        let acl = AclDetails::topic("orders", "User:svc", AclOperation::Write);
        let mut desired = DesiredState::default();
        desired.acls.push((String::from("orders-service-7"), acl.clone()));
        let mut snapshot = ClusterSnapshot::default();
        snapshot.acls.push(acl.clone());

        let plans = engine().plan_acls(&desired, &snapshot);
        assert_eq!(
            plans,
            vec![AclPlan {
                name: String::from("orders-service-7"),
                acl_details: acl,
                action: PlanAction::NoChange,
            }]
        );
    }

    #[test]
    fn test_acl_add_and_remove() {
        let wanted = AclDetails::topic("orders", "User:svc", AclOperation::Write);
        let stale = AclDetails::topic("orders", "User:svc", AclOperation::Read);
        let mut desired = DesiredState::default();
        desired.acls.push((String::from("svc-0"), wanted.clone()));
        let mut snapshot = ClusterSnapshot::default();
        snapshot.acls.push(stale.clone());

        let plans = engine().plan_acls(&desired, &snapshot);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].name, UNNAMED_ACL);
        assert_eq!(plans[0].acl_details, stale);
        assert_eq!(plans[0].action, PlanAction::Remove);
        assert_eq!(plans[1].name, "svc-0");
        assert_eq!(plans[1].action, PlanAction::Add);
    }

    #[test]
    fn test_skip_flags() {
        let desired = desired_with_topic("orders", TopicDetails::new(1, 1));
        let engine = DiffEngine::new(PlanOptions {
            skip_topics: true,
            ..PlanOptions::default()
        });
        assert!(engine.plan(&desired, &ClusterSnapshot::default()).topic_plans.is_empty());
    }
}
