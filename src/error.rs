//! Error types for the Kafka GitOps system.
//!
//! This module provides the error hierarchy for every stage of a run:
//! reading and validating the declared state, planning, persisting plans,
//! talking to the cluster and to the account directory.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Kafka GitOps system.
#[derive(Debug, Error)]
pub enum GitopsError {
    /// Declared configuration errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Plan generation and plan file errors.
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// Cluster communication and execution errors.
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    /// Account directory errors.
    #[error("Account directory error: {0}")]
    Account(#[from] AccountError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Declared configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The state file was not found.
    #[error("State file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The state file could not be parsed.
    #[error("Failed to parse state file: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("{message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Path of the offending definition.
        field: Option<String>,
    },

    /// A custom ACL field holds a value outside its allowed set.
    #[error("Invalid value '{value}' for field '{field}'. Allowed values: [{}]", allowed_values.join(", "))]
    InvalidAclDefinition {
        /// Name of the offending field.
        field: String,
        /// The rejected value.
        value: String,
        /// Values accepted for the field.
        allowed_values: Vec<String>,
    },

    /// A required piece of configuration is absent.
    #[error("Missing configuration: {message}")]
    MissingConfiguration {
        /// Description of what is missing.
        message: String,
    },

    /// No account with the expected name exists in the account directory.
    #[error("Service account not found: {name}")]
    ServiceAccountNotFound {
        /// Expected account name.
        name: String,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// An operation needs identity provisioning but it is turned off.
    #[error("Confluent Cloud must be enabled in the state file to use this command")]
    CloudNotEnabled,
}

/// Plan errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The configured plan file does not exist.
    #[error("The specified plan file could not be found: {path}")]
    PlanFileNotFound {
        /// Path to the missing plan file.
        path: PathBuf,
    },

    /// The plan file exists but could not be read or parsed.
    #[error("Failed to read plan file: {message}")]
    ReadPlanInput {
        /// Description of the failure.
        message: String,
    },

    /// The plan could not be written.
    #[error("Failed to write plan file: {message}")]
    WritePlanOutput {
        /// Description of the failure.
        message: String,
    },

    /// A plan entry is internally inconsistent.
    #[error("Invalid plan: {message}")]
    InvalidPlan {
        /// Description of the inconsistency.
        message: String,
    },
}

/// Cluster errors.
#[derive(Debug, Error)]
pub enum KafkaError {
    /// A mutating call failed while applying a plan.
    #[error("{message}: {cause}")]
    Execution {
        /// What was being attempted.
        message: String,
        /// Message reported by the cluster.
        cause: String,
    },

    /// Authentication against the REST proxy failed.
    #[error("Kafka REST authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("Kafka REST request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the proxy.
        message: String,
    },

    /// Rate limited.
    #[error("Kafka REST proxy rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("Network error communicating with Kafka REST proxy: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the proxy.
    #[error("Invalid response from Kafka REST proxy: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Account directory errors.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Authentication failed.
    #[error("Confluent Cloud authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("Confluent Cloud API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from API.
        message: String,
    },

    /// Network error.
    #[error("Network error communicating with Confluent Cloud: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from Confluent Cloud: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Result type alias for Kafka GitOps operations.
pub type Result<T> = std::result::Result<T, GitopsError>;

impl GitopsError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Kafka(KafkaError::RateLimited { .. } | KafkaError::NetworkError { .. })
                | Self::Account(AccountError::NetworkError { .. })
        )
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Kafka(KafkaError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            Self::Kafka(KafkaError::NetworkError { .. })
            | Self::Account(AccountError::NetworkError { .. }) => Some(1),
            _ => None,
        }
    }

    /// Returns true if this error was raised while mutating the cluster.
    #[must_use]
    pub const fn is_execution_error(&self) -> bool {
        matches!(self, Self::Kafka(KafkaError::Execution { .. }))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a missing configuration error.
    #[must_use]
    pub fn missing(message: impl Into<String>) -> Self {
        Self::MissingConfiguration {
            message: message.into(),
        }
    }
}

impl KafkaError {
    /// Creates an execution error wrapping the cluster-reported cause.
    #[must_use]
    pub fn execution(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Execution {
            message: message.into(),
            cause: cause.to_string(),
        }
    }

    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

impl AccountError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_acl_definition_lists_allowed_values() {
        let err = ConfigError::InvalidAclDefinition {
            field: String::from("pattern"),
            value: String::from("FUZZY"),
            allowed_values: vec![String::from("LITERAL"), String::from("PREFIXED")],
        };
        assert_eq!(
            err.to_string(),
            "Invalid value 'FUZZY' for field 'pattern'. Allowed values: [LITERAL, PREFIXED]"
        );
    }

    #[test]
    fn test_retryable() {
        let err = GitopsError::Kafka(KafkaError::network("reset"));
        assert!(err.is_retryable());
        assert_eq!(err.retry_delay_secs(), Some(1));

        let err = GitopsError::Kafka(KafkaError::execution("Error creating topic", "boom"));
        assert!(!err.is_retryable());
        assert!(err.is_execution_error());
    }
}
