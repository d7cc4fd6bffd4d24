//! # Arena Configuration
//!
//! Loaded once, before the arena exists. Values are immutable afterwards.
//!
//! ```toml
//! capacity = 4096
//! label = "frame-scratch"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ArenaError, ArenaResult};

/// Configuration for a single arena.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArenaConfig {
    /// Fixed size of the backing block in bytes.
    pub capacity: usize,
    /// Name attached to every diagnostic the arena emits.
    pub label: String,
}

impl ArenaConfig {
    /// Default block size in bytes.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Default diagnostic label.
    pub const DEFAULT_LABEL: &'static str = "arena";

    /// Creates a config for an arena of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            label: Self::DEFAULT_LABEL.to_string(),
        }
    }

    /// Replaces the diagnostic label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Parses a config from TOML text. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::InvalidConfig`] if the text is not valid TOML,
    /// has unknown keys, or fails [`ArenaConfig::validate`].
    pub fn from_toml_str(text: &str) -> ArenaResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ArenaError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::InvalidConfig`] if the file cannot be read or
    /// its contents are rejected by [`ArenaConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> ArenaResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ArenaError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks that the capacity can back a real block.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::InvalidConfig`] for a zero capacity or one larger
    /// than `isize::MAX`, the most a single allocation can hold.
    pub fn validate(&self) -> ArenaResult<()> {
        if self.capacity == 0 {
            return Err(ArenaError::InvalidConfig(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if isize::try_from(self.capacity).is_err() {
            return Err(ArenaError::InvalidConfig(format!(
                "capacity {} exceeds isize::MAX",
                self.capacity
            )));
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
