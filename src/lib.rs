// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is flagged
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are flagged
#![warn(unused_variables)]            // Unused variables are flagged
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Kafka GitOps
//!
//! Declarative, plan-then-apply management of Kafka topics and ACLs.
//!
//! ## Overview
//!
//! The desired state of a cluster lives in a YAML file under version
//! control. Kafka GitOps turns that file into concrete topics and ACLs,
//! compares them with what the cluster holds and applies the difference:
//!
//! - Topics with partitions, replication and config overrides
//! - Services whose ACLs are derived from what they produce and consume
//! - Users whose ACLs are derived from roles
//! - Custom ACLs for anything the archetypes do not cover
//!
//! ## Architecture
//!
//! 1. **Desired State**: resolved from the state file by [`state::StateResolver`]
//! 2. **Actual State**: one [`kafka::ClusterSnapshot`] per run
//! 3. **Plan**: computed by [`planner::DiffEngine`], optionally persisted
//! 4. **Apply**: executed in order by [`planner::PlanExecutor`], stopping at
//!    the first failure with no rollback
//!
//! ## Modules
//!
//! - [`config`]: State file parsing, validation and client settings
//! - [`state`]: Resolved topics and ACLs, roles and service archetypes
//! - [`kafka`]: Cluster client contract, REST proxy and in-memory backends
//! - [`accounts`]: Account directory for identity provisioning
//! - [`planner`]: Diffing, plan persistence and plan execution
//! - [`manager`]: Plan and apply orchestration
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! settings:
//!   topics:
//!     defaults:
//!       replication: 3
//!
//! topics:
//!   orders:
//!     partitions: 6
//!     configs:
//!       cleanup.policy: compact
//!
//! services:
//!   billing:
//!     type: application
//!     principal: User:billing
//!     consumes:
//!       - orders
//!
//! users:
//!   alice:
//!     principal: User:alice
//!     roles:
//!       - reader
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod accounts;
pub mod cli;
pub mod config;
pub mod error;
pub mod kafka;
pub mod manager;
pub mod planner;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigHasher, ConfigParser, ConfigValidator, DesiredStateFile};
pub use error::{GitopsError, Result};
pub use kafka::{ClusterClient, ClusterSnapshot, InMemoryCluster, RestClusterClient};
pub use manager::{ApplyOutcome, PlanOutcome, StateManager};
pub use planner::{DesiredPlan, DiffEngine, LocalPlanStore, PlanExecutor, PlanStore};
pub use state::{DesiredState, StateResolver};
