use crate::config::ConfigError;
use tracing::info;

/// A round-robin pool of backend API credentials.
///
/// Membership is fixed at construction; only the cursor moves. Rotating
/// past the last credential wraps back to the first, so the active index
/// is always within `[0, len)`.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    keys: Vec<String>,
    current_index: usize,
}

impl CredentialPool {
    /// Builds a pool from an ordered list of credentials.
    ///
    /// Fails with [`ConfigError::NoCredentials`] when the list is empty;
    /// every other operation on the pool is then infallible.
    pub fn new(keys: Vec<String>) -> Result<Self, ConfigError> {
        if keys.is_empty() {
            return Err(ConfigError::NoCredentials);
        }
        Ok(Self {
            keys,
            current_index: 0,
        })
    }

    /// Returns the credential the next backend call should use.
    pub fn current(&self) -> &str {
        &self.keys[self.current_index]
    }

    /// Advances the cursor by one position, wrapping modulo pool size,
    /// and returns the newly active credential.
    pub fn rotate(&mut self) -> &str {
        self.current_index = (self.current_index + 1) % self.keys.len();
        info!(index = self.current_index, "rotated to next credential");
        &self.keys[self.current_index]
    }

    /// Number of credentials in the pool, always at least one.
    pub fn len(&self) -> usize {
        self.keys.len()
    }
}
