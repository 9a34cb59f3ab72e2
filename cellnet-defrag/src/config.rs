//! Defragmentation engine configuration
//!
//! Configuration loaded from environment variables and command line.

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Reshuffle and reporting configuration
#[derive(Debug, Clone)]
pub struct DefragConfig {
    /// Entries processed per scheduling tick
    pub batch_size: usize,

    /// Entry totals at or above this require explicit confirmation
    pub confirm_threshold: usize,

    /// Simulate extract/reinject before committing; skip entries the
    /// network could not fully reabsorb
    pub void_protection: bool,

    /// Defined but currently has no effect; see `ReshuffleTask`
    pub overwrite_protection: bool,

    /// Rows shown in the most-fragmented-cells report section
    pub top_fragmented: usize,
}

impl Default for DefragConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            confirm_threshold: 1000,
            void_protection: true,
            overwrite_protection: false,
            top_fragmented: 10,
        }
    }
}

impl DefragConfig {
    /// Create configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let batch_size = read_env("CELLNET_BATCH_SIZE", defaults.batch_size)?;
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue(
                "CELLNET_BATCH_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            batch_size,
            confirm_threshold: read_env("CELLNET_CONFIRM_THRESHOLD", defaults.confirm_threshold)?,
            void_protection: read_env_bool("CELLNET_VOID_PROTECTION", defaults.void_protection),
            overwrite_protection: read_env_bool(
                "CELLNET_OVERWRITE_PROTECTION",
                defaults.overwrite_protection,
            ),
            top_fragmented: read_env("CELLNET_TOP_FRAGMENTED", defaults.top_fragmented)?,
        })
    }
}

fn read_env(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

fn read_env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DefragConfig::default();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.confirm_threshold, 1000);
        assert!(config.void_protection);
        assert!(!config.overwrite_protection);
    }

    #[test]
    fn test_from_env_defaults_when_unset() {
        // Relies on the vars not being set in the test environment.
        let config = DefragConfig::from_env().unwrap();
        assert_eq!(config.batch_size, DefragConfig::default().batch_size);
    }
}
