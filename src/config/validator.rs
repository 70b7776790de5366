//! Desired state file validation.
//!
//! Validation runs before anything is resolved or sent to the cluster. Errors
//! abort the run and name the offending definition; warnings are reported by
//! `validate --warnings` and never block.

use crate::error::{ConfigError, GitopsError, Result};
use tracing::debug;

use super::spec::{CustomAclDetails, DesiredStateFile};
use crate::state::RoleTable;
use std::collections::BTreeMap;

/// Validator for desired state files.
#[derive(Debug, Default)]
pub struct ConfigValidator {
    /// Roles users may reference.
    roles: RoleTable,
}

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The definition path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a validator with the built-in roles.
    #[must_use]
    pub fn new() -> Self {
        Self {
            roles: RoleTable::new(),
        }
    }

    /// Creates a validator that accepts the roles of the given table.
    #[must_use]
    pub const fn with_roles(roles: RoleTable) -> Self {
        Self { roles }
    }

    /// Validates a desired state file.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate(&self, state: &DesiredStateFile) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_topics(state, &mut result);
        Self::validate_custom_acls("service", &state.custom_service_acls, &mut result);
        Self::validate_custom_acls("user", &state.custom_user_acls, &mut result);
        self.validate_users(state, &mut result);
        Self::validate_owner_names(state, &mut result);
        Self::collect_principal_warnings(state, &mut result);

        if result.errors.is_empty() {
            debug!("State file validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(GitopsError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Validates replication and partition counts.
    fn validate_topics(state: &DesiredStateFile, result: &mut ValidationResult) {
        let default_replication = state.default_replication();

        if let Some(replication) = default_replication
            && replication < 1
        {
            result.errors.push(ValidationError {
                field: String::from("settings.topics.defaults.replication"),
                message: String::from("The default replication factor must be a positive integer."),
            });
        }

        for (name, topic) in &state.topics {
            let field = format!("topics -> {name}");

            match topic.replication {
                None if default_replication.is_none() => {
                    result.errors.push(ValidationError {
                        field: field.clone(),
                        message: format!(
                            "Not set: [replication] in state file definition: topics -> {name}"
                        ),
                    });
                }
                Some(replication) if replication < 1 => {
                    result.errors.push(ValidationError {
                        field: field.clone(),
                        message: format!(
                            "Invalid: [replication] must be a positive integer in state file definition: topics -> {name}"
                        ),
                    });
                }
                _ => {}
            }

            if topic.partitions < 1 {
                result.errors.push(ValidationError {
                    field: field.clone(),
                    message: format!(
                        "Invalid: [partitions] must be a positive integer in state file definition: topics -> {name}"
                    ),
                });
            }

            if let Some(prefix) = state
                .blacklist_prefixes()
                .iter()
                .find(|prefix| name.starts_with(prefix.as_str()))
            {
                result.warnings.push(format!(
                    "{field}: topic is declared under ignored prefix '{prefix}' and will never be removed"
                ));
            }
        }
    }

    /// Validates the enumerated fields of custom ACLs.
    fn validate_custom_acls(
        owner_kind: &str,
        acls: &BTreeMap<String, BTreeMap<String, CustomAclDetails>>,
        result: &mut ValidationResult,
    ) {
        for (owner, details) in acls {
            // Only the first invalid entry per owner is reported.
            let invalid = details.iter().find_map(|(acl_name, acl)| {
                acl.validate().err().map(|err| (acl_name, err))
            });

            if let Some((acl_name, ConfigError::InvalidAclDefinition { field, allowed_values, .. })) =
                invalid
            {
                result.errors.push(ValidationError {
                    field: format!("custom{}Acls -> {owner} -> {acl_name}", capitalize(owner_kind)),
                    message: format!(
                        "Custom ACL definition for {owner_kind} '{owner}' is invalid for field '{field}'. Allowed values: [{}]",
                        allowed_values.join(", ")
                    ),
                });
            }
        }
    }

    /// Validates role references.
    fn validate_users(&self, state: &DesiredStateFile, result: &mut ValidationResult) {
        for (name, user) in &state.users {
            for role in user.roles.iter().filter(|role| !self.roles.contains(role)) {
                result.errors.push(ValidationError {
                    field: format!("users -> {name} -> roles"),
                    message: format!(
                        "Unknown role '{role}' for user '{name}'. Allowed values: [{}]",
                        self.roles.names().join(", ")
                    ),
                });
            }
        }
    }

    /// Rejects services and users that share a name, since both key their
    /// access entries `<name>-<index>`.
    fn validate_owner_names(state: &DesiredStateFile, result: &mut ValidationResult) {
        for name in state.users.keys().filter(|name| state.services.contains_key(*name)) {
            result.errors.push(ValidationError {
                field: format!("users -> {name}"),
                message: format!(
                    "The service '{name}' and the user '{name}' share a name; their ACL keys would collide"
                ),
            });
        }
    }

    /// Warns about principals that will be required at resolution time.
    fn collect_principal_warnings(state: &DesiredStateFile, result: &mut ValidationResult) {
        if state.is_cloud_enabled() {
            return;
        }

        for (name, service) in &state.services {
            if service.principal().is_none() {
                result.warnings.push(format!(
                    "services -> {name}: no principal set; resolution fails if the service needs any ACL"
                ));
            }
        }

        for (name, user) in &state.users {
            if user.principal.is_none() {
                result
                    .warnings
                    .push(format!("users -> {name}: no principal set"));
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;

    fn parse(yaml: &str) -> DesiredStateFile {
        ConfigParser::new().parse_yaml(yaml, None).unwrap()
    }

    fn message(result: Result<ValidationResult>) -> String {
        match result {
            Err(GitopsError::Config(ConfigError::ValidationError { message, .. })) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_replication() {
        let state = parse("topics:\n  orders:\n    partitions: 3\n");
        assert_eq!(
            message(ConfigValidator::new().validate(&state)),
            "Not set: [replication] in state file definition: topics -> orders"
        );
    }

    #[test]
    fn test_default_replication_fills_gap() {
        let state = parse(
            "settings:\n  topics:\n    defaults:\n      replication: 3\ntopics:\n  orders:\n    partitions: 3\n",
        );
        assert!(ConfigValidator::new().validate(&state).unwrap().is_valid());
    }

    #[test]
    fn test_non_positive_default_replication() {
        for value in ["0", "-1"] {
            let state = parse(&format!(
                "settings:\n  topics:\n    defaults:\n      replication: {value}\n"
            ));
            assert_eq!(
                message(ConfigValidator::new().validate(&state)),
                "The default replication factor must be a positive integer."
            );
        }
    }

    #[test]
    fn test_invalid_custom_acl_names_owner() {
        let state = parse(
            r"
customServiceAcls:
  billing:
    bad:
      name: payments
      type: TOPIC
      pattern: FUZZY
      operation: READ
",
        );
        assert_eq!(
            message(ConfigValidator::new().validate(&state)),
            "Custom ACL definition for service 'billing' is invalid for field 'pattern'. Allowed values: [MATCH, LITERAL, PREFIXED]"
        );
    }

    #[test]
    fn test_unknown_role() {
        let state = parse("users:\n  alice:\n    principal: User:alice\n    roles: [admin]\n");
        assert_eq!(
            message(ConfigValidator::new().validate(&state)),
            "Unknown role 'admin' for user 'alice'. Allowed values: [operator, reader, writer]"
        );
    }

    #[test]
    fn test_service_and_user_with_same_name() {
        let state = parse(
            "services:\n  analytics:\n    type: application\n    principal: User:svc\nusers:\n  analytics:\n    principal: User:human\n    roles: [writer]\n",
        );
        assert_eq!(
            message(ConfigValidator::new().validate(&state)),
            "The service 'analytics' and the user 'analytics' share a name; their ACL keys would collide"
        );
    }

    #[test]
    fn test_warnings() {
        let state = parse(
            r"
settings:
  topics:
    blacklist:
      prefixed: [_internal]
topics:
  _internal.audit:
    partitions: 1
    replication: 1
users:
  bob:
    roles: [reader]
",
        );
        let result = ConfigValidator::new().validate(&state).unwrap();
        assert_eq!(result.warning_count(), 2);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("service"), "Service");
        assert_eq!(capitalize(""), "");
    }
}
