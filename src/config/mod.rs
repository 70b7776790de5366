//! Configuration module for the Kafka GitOps system.
//!
//! This module handles all configuration-related functionality:
//! - Parsing the desired state YAML file and its auxiliary files
//! - Validation of declared topics, ACLs and roles
//! - Fingerprinting the state file for plan drift detection
//! - Client settings read from the environment

mod env;
mod hash;
mod parser;
mod spec;
mod validator;

pub use env::{CloudConfig, ClusterConfig, Credentials};
pub use hash::ConfigHasher;
pub use parser::ConfigParser;
pub use spec::{
    ApplicationService, CloudSettings, ConnectorDetails, CustomAclDetails, DesiredStateFile,
    FileSettings, KafkaConnectService, KafkaStreamsService, PrefixList, ServiceAclSettings,
    ServiceDetails, ServiceSettings, Settings, StorageTopics, TopicDefaults, TopicSettings,
    UserDetails,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
