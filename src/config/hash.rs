//! State file fingerprinting.
//!
//! A persisted plan records the fingerprint of the state file it was computed
//! from so that a later apply can tell whether the declared state moved on.

use sha2::{Digest, Sha256};

use super::spec::DesiredStateFile;
use crate::error::{GitopsError, Result};

/// Hasher for computing state file fingerprints.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the SHA-256 fingerprint of a merged state file.
    ///
    /// All maps in the state file are ordered, so the canonical JSON form is
    /// stable across runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized.
    pub fn hash_state(&self, state: &DesiredStateFile) -> Result<String> {
        let mut hasher = Sha256::new();
        serde_json::to_writer(&mut hasher, state)
            .map_err(|e| GitopsError::internal(format!("Failed to fingerprint state file: {e}")))?;
        Ok(hex::encode(hasher.finalize()))
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }

    /// Compares two hashes.
    #[must_use]
    pub fn hashes_match(hash1: &str, hash2: &str) -> bool {
        hash1.len() == hash2.len()
            && hash1
                .bytes()
                .zip(hash2.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}
