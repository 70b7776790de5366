//! Plan types.
//!
//! A plan is an ordered list of topic actions followed by an ordered list of
//! ACL actions. It is the unit that gets persisted by `plan --out` and
//! reloaded by `apply --plan`, so the serialized form is stable camelCase
//! JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{AclDetails, TopicDetails};

/// What happens to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanAction {
    /// Create.
    Add,
    /// Modify in place.
    Update,
    /// Delete.
    Remove,
    /// Leave alone.
    NoChange,
}

/// Knobs that change what gets planned, counted and applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Never remove topics or ACLs.
    pub delete_disabled: bool,
    /// Leave topics out entirely.
    pub skip_topics: bool,
    /// Leave ACLs out entirely.
    pub skip_acls: bool,
}

/// Change to one topic config key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicConfigPlan {
    /// Config key.
    pub key: String,
    /// Target value; absent for removals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Action.
    pub action: PlanAction,
}

/// Change to one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicPlan {
    /// Topic name.
    pub name: String,
    /// Action.
    pub action: PlanAction,
    /// Resolved definition; absent for removals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_details: Option<TopicDetails>,
    /// Per-key config changes, ordered by key.
    #[serde(default)]
    pub topic_config_plans: Vec<TopicConfigPlan>,
}

/// Change to one ACL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclPlan {
    /// Identity key from the desired state, or a label for cluster-only entries.
    pub name: String,
    /// The full binding.
    pub acl_details: AclDetails,
    /// Action.
    pub action: PlanAction,
}

/// A complete plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredPlan {
    /// Topic actions, applied first.
    #[serde(default)]
    pub topic_plans: Vec<TopicPlan>,
    /// ACL actions, applied after every topic action.
    #[serde(default)]
    pub acl_plans: Vec<AclPlan>,
    /// When the plan was generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// Fingerprint of the state file the plan was generated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_hash: Option<String>,
}

/// Action counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOverview {
    /// Resources to create.
    pub add: usize,
    /// Resources to update.
    pub update: usize,
    /// Resources to delete.
    pub remove: usize,
}

/// Outcome of the has-changes check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
    /// Nothing to do; the cluster matches the desired state.
    UpToDate,
    /// There is work to apply.
    HasChanges(PlanOverview),
}

impl PlanOverview {
    /// Returns the total number of actions.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.add + self.update + self.remove
    }

    /// Returns true if nothing would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }

    fn count(actions: impl Iterator<Item = PlanAction>, delete_disabled: bool) -> Self {
        let mut overview = Self::default();
        for action in actions {
            match action {
                PlanAction::Add => overview.add += 1,
                PlanAction::Update => overview.update += 1,
                PlanAction::Remove if !delete_disabled => overview.remove += 1,
                PlanAction::Remove | PlanAction::NoChange => {}
            }
        }
        overview
    }

    const fn merge(self, other: Self) -> Self {
        Self {
            add: self.add + other.add,
            update: self.update + other.update,
            remove: self.remove + other.remove,
        }
    }
}

impl DesiredPlan {
    /// Creates a plan from its entries.
    #[must_use]
    pub const fn new(topic_plans: Vec<TopicPlan>, acl_plans: Vec<AclPlan>) -> Self {
        Self {
            topic_plans,
            acl_plans,
            generated_at: None,
            state_hash: None,
        }
    }

    /// Stamps the plan with its generation time and state fingerprint.
    #[must_use]
    pub fn with_metadata(mut self, generated_at: DateTime<Utc>, state_hash: impl Into<String>) -> Self {
        self.generated_at = Some(generated_at);
        self.state_hash = Some(state_hash.into());
        self
    }

    /// Counts topic actions.
    #[must_use]
    pub fn topic_overview(&self, delete_disabled: bool) -> PlanOverview {
        PlanOverview::count(self.topic_plans.iter().map(|p| p.action), delete_disabled)
    }

    /// Counts ACL actions.
    #[must_use]
    pub fn acl_overview(&self, delete_disabled: bool) -> PlanOverview {
        PlanOverview::count(self.acl_plans.iter().map(|p| p.action), delete_disabled)
    }

    /// Counts every action that would be applied under `options`.
    #[must_use]
    pub fn overview(&self, options: PlanOptions) -> PlanOverview {
        let mut overview = PlanOverview::default();
        if !options.skip_topics {
            overview = overview.merge(self.topic_overview(options.delete_disabled));
        }
        if !options.skip_acls {
            overview = overview.merge(self.acl_overview(options.delete_disabled));
        }
        overview
    }

    /// Checks whether applying the plan under `options` would change anything.
    #[must_use]
    pub fn status(&self, options: PlanOptions) -> PlanStatus {
        let overview = self.overview(options);
        if overview.is_empty() {
            PlanStatus::UpToDate
        } else {
            PlanStatus::HasChanges(overview)
        }
    }

    /// Returns a copy without NO_CHANGE entries or config sub-entries.
    #[must_use]
    pub fn to_changes_only(&self) -> Self {
        let topic_plans = self
            .topic_plans
            .iter()
            .filter(|p| p.action != PlanAction::NoChange)
            .map(|p| TopicPlan {
                topic_config_plans: p
                    .topic_config_plans
                    .iter()
                    .filter(|c| c.action != PlanAction::NoChange)
                    .cloned()
                    .collect(),
                ..p.clone()
            })
            .collect();
        let acl_plans = self
            .acl_plans
            .iter()
            .filter(|p| p.action != PlanAction::NoChange)
            .cloned()
            .collect();

        Self {
            topic_plans,
            acl_plans,
            generated_at: self.generated_at,
            state_hash: self.state_hash.clone(),
        }
    }
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Add => "ADD",
            Self::Update => "UPDATE",
            Self::Remove => "REMOVE",
            Self::NoChange => "NO_CHANGE",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for PlanOverview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete",
            self.add, self.update, self.remove
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AclOperation;

    fn topic(name: &str, action: PlanAction) -> TopicPlan {
        TopicPlan {
            name: name.to_string(),
            action,
            topic_details: None,
            topic_config_plans: vec![],
        }
    }

    fn acl(name: &str, action: PlanAction) -> AclPlan {
        AclPlan {
            name: name.to_string(),
            acl_details: AclDetails::topic(name, "User:x", AclOperation::Read),
            action,
        }
    }

    fn sample() -> DesiredPlan {
        let mut update = topic("b", PlanAction::Update);
        update.topic_config_plans = vec![
            TopicConfigPlan {
                key: String::from("cleanup.policy"),
                value: Some(String::from("compact")),
                action: PlanAction::NoChange,
            },
            TopicConfigPlan {
                key: String::from("retention.ms"),
                value: None,
                action: PlanAction::Remove,
            },
        ];
        DesiredPlan::new(
            vec![topic("a", PlanAction::Add), update, topic("c", PlanAction::NoChange)],
            vec![acl("x-0", PlanAction::NoChange), acl("Unnamed ACL", PlanAction::Remove)],
        )
    }

    #[test]
    fn test_overview_respects_flags() {
        let plan = sample();
        assert_eq!(
            plan.overview(PlanOptions::default()),
            PlanOverview {
                add: 1,
                update: 1,
                remove: 1
            }
        );

        let no_delete = PlanOptions {
            delete_disabled: true,
            ..PlanOptions::default()
        };
        assert_eq!(plan.overview(no_delete).remove, 0);

        let skip_topics = PlanOptions {
            skip_topics: true,
            ..PlanOptions::default()
        };
        assert_eq!(plan.overview(skip_topics).total(), 1);
    }

    #[test]
    fn test_status_up_to_date() {
        let plan = DesiredPlan::new(vec![topic("a", PlanAction::NoChange)], vec![]);
        assert_eq!(plan.status(PlanOptions::default()), PlanStatus::UpToDate);

        let only_acl_removals = DesiredPlan::new(vec![], vec![acl("Unnamed ACL", PlanAction::Remove)]);
        let no_delete = PlanOptions {
            delete_disabled: true,
            ..PlanOptions::default()
        };
        assert_eq!(only_acl_removals.status(no_delete), PlanStatus::UpToDate);
    }

    #[test]
    fn test_changes_only() {
        let reduced = sample().to_changes_only();
        let names: Vec<&str> = reduced.topic_plans.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(reduced.topic_plans[1].topic_config_plans.len(), 1);
        assert_eq!(reduced.acl_plans.len(), 1);
        assert_eq!(reduced.acl_plans[0].action, PlanAction::Remove);
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["topicPlans"][0]["action"], "ADD");
        assert_eq!(json["topicPlans"][1]["topicConfigPlans"][1]["action"], "REMOVE");
        assert_eq!(json["aclPlans"][0]["aclDetails"]["type"], "TOPIC");
        assert_eq!(json["aclPlans"][0]["action"], "NO_CHANGE");
        assert!(json.get("stateHash").is_none());
    }
}
