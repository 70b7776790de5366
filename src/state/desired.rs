//! The resolved desired state.

use std::collections::BTreeMap;

use super::types::{AclDetails, TopicDetails};

/// Fully resolved target configuration.
///
/// Every topic carries a concrete replication factor and every access entry a
/// principal. Built once per run by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    /// Topics keyed by name.
    pub topics: BTreeMap<String, TopicDetails>,
    /// Access entries keyed by `<owner>-<index>`, in emission order.
    pub acls: Vec<(String, AclDetails)>,
    /// Cluster topics under these prefixes are never removed.
    pub prefixed_topics_to_ignore: Vec<String>,
    /// When non-empty, only cluster topics under these prefixes are managed.
    pub prefixed_topics_to_accept: Vec<String>,
}

impl DesiredState {
    /// Looks up an access entry by key.
    #[must_use]
    pub fn acl(&self, key: &str) -> Option<&AclDetails> {
        self.acls
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, acl)| acl)
    }

    /// Returns true if the topic starts with any ignore prefix.
    #[must_use]
    pub fn is_ignored(&self, topic: &str) -> bool {
        self.prefixed_topics_to_ignore
            .iter()
            .any(|prefix| topic.starts_with(prefix.as_str()))
    }

    /// Returns true if the topic is inside the managed set.
    #[must_use]
    pub fn is_accepted(&self, topic: &str) -> bool {
        self.prefixed_topics_to_accept.is_empty()
            || self
                .prefixed_topics_to_accept
                .iter()
                .any(|prefix| topic.starts_with(prefix.as_str()))
    }
}
