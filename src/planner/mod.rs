//! Planning module.
//!
//! This module handles the comparison between the desired state and a
//! cluster snapshot, the persistence of the resulting plan, and its
//! execution against the cluster.

mod diff;
mod executor;
mod plan;
mod store;

pub use diff::{DiffEngine, UNNAMED_ACL};
pub use executor::PlanExecutor;
pub use plan::{
    AclPlan, DesiredPlan, PlanAction, PlanOptions, PlanOverview, PlanStatus, TopicConfigPlan,
    TopicPlan,
};
pub use store::{LocalPlanStore, PlanStore};
