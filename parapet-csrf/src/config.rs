use crate::error::{CsrfError, CsrfResult};

/// Minimum byte length for token values. Weaker settings are rejected at
/// guard construction.
pub const MIN_STRENGTH: usize = 16;

/// Default bound on retained token pairs per storage collection.
pub const DEFAULT_STORAGE_LIMIT: i64 = 200;

/// CSRF guard configuration
#[derive(Debug, Clone)]
pub struct CsrfConfig {
    /// Namespacing key for storage and request-attribute names
    pub prefix: String,

    /// Byte length of random token values (minimum 16)
    pub strength: usize,

    /// Maximum retained token pairs; zero or negative disables enforcement
    pub storage_limit: i64,

    /// Keep one token alive for the whole session instead of rotating
    /// every request
    pub persistent_tokens: bool,
}

impl CsrfConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self {
            prefix: "csrf".to_string(),
            strength: MIN_STRENGTH,
            storage_limit: DEFAULT_STORAGE_LIMIT,
            persistent_tokens: false,
        }
    }

    /// Set the key prefix. Trailing `_` separators are trimmed.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = prefix.trim_end_matches('_').to_string();
        self
    }

    /// Set the token value strength in bytes.
    pub fn with_strength(mut self, strength: usize) -> Self {
        self.strength = strength;
        self
    }

    /// Set the storage limit.
    pub fn with_storage_limit(mut self, limit: i64) -> Self {
        self.storage_limit = limit;
        self
    }

    /// Enable or disable persistent token mode.
    pub fn with_persistent_tokens(mut self, persistent: bool) -> Self {
        self.persistent_tokens = persistent;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> CsrfResult<()> {
        if self.strength < MIN_STRENGTH {
            return Err(CsrfError::Configuration(format!(
                "token strength must be at least {} bytes, got {}",
                MIN_STRENGTH, self.strength
            )));
        }
        Ok(())
    }

    /// Request-attribute and form-field key carrying the token name.
    pub fn token_name_key(&self) -> String {
        format!("{}_name", self.prefix)
    }

    /// Request-attribute and form-field key carrying the token value.
    pub fn token_value_key(&self) -> String {
        format!("{}_value", self.prefix)
    }
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self::new()
    }
}
