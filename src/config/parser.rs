//! State file parser.
//!
//! This module loads the desired state YAML file, merges the auxiliary
//! services/topics/users files it references and loads the `.env` file used
//! by the cluster and account directory clients.

use crate::error::{ConfigError, GitopsError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::DesiredStateFile;

/// Parser for desired state files.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new state file parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving auxiliary files and `.env`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a state file and merges its auxiliary files.
    ///
    /// Auxiliary files are resolved relative to the base path if set,
    /// otherwise relative to the directory holding the main file.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be found, read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DesiredStateFile> {
        let path = path.as_ref();
        info!("Loading state file from: {}", path.display());

        let mut state = Self::read_file(path)?;

        let base = self.base_path.clone().unwrap_or_else(|| {
            path.parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        });
        let files = state.settings.files.clone();

        if let Some(file) = files.services {
            let other = Self::read_auxiliary(&base, "Services", &file)?;
            state.merge_services(other);
        }
        if let Some(file) = files.topics {
            let other = Self::read_auxiliary(&base, "Topics", &file)?;
            state.merge_topics(other);
        }
        if let Some(file) = files.users {
            let other = Self::read_auxiliary(&base, "Users", &file)?;
            state.merge_users(other);
        }

        Ok(state)
    }

    /// Parses a state file from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<DesiredStateFile> {
        Self::parse(content, source)
    }

    fn parse(content: &str, source: Option<&Path>) -> Result<DesiredStateFile> {
        debug!("Parsing YAML state file");

        // An empty document is a valid, empty state.
        if content.trim().is_empty() {
            return Ok(DesiredStateFile::default());
        }

        let state: DesiredStateFile = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            GitopsError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed {} topics, {} services, {} users",
            state.topics.len(),
            state.services.len(),
            state.users.len()
        );
        Ok(state)
    }

    fn read_file(path: &Path) -> Result<DesiredStateFile> {
        if !path.exists() {
            return Err(GitopsError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            GitopsError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        Self::parse(&content, Some(path))
    }

    fn read_auxiliary(base: &Path, kind: &str, file: &str) -> Result<DesiredStateFile> {
        let path = base.join(file);
        if !path.exists() {
            return Err(GitopsError::Config(ConfigError::validation(
                format!("{kind} file '{file}' could not be found"),
                format!("settings.files.{}", kind.to_lowercase()),
            )));
        }
        debug!("Merging {} from {}", kind.to_lowercase(), path.display());
        Self::read_file(&path)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                GitopsError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}
