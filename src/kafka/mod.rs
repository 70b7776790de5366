//! Cluster access.
//!
//! This module provides:
//! - The cluster client contract consumed by the planner and executor
//! - A one-shot snapshot of topics, topic configs and ACLs
//! - A Kafka REST Proxy v3 backend
//! - An in-memory backend

mod client;
mod memory;
mod rest;
mod snapshot;
mod types;

pub use client::ClusterClient;
pub use memory::{ClusterCall, InMemoryCluster};
pub use rest::RestClusterClient;
pub use snapshot::ClusterSnapshot;
pub use types::{ConfigChange, ConfigEntry, ConfigSource};
