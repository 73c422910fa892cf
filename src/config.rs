//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::error::{CacheError, Result};

/// Default upper bound for the persistence layer, in megabytes.
pub const DEFAULT_MAX_MB_PERSISTENCE: u64 = 100;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the disk persistence writes its records into
    pub cache_directory: PathBuf,
    /// Maximum size of the persistence layer in megabytes
    pub max_mb_persistence: u64,
    /// Serve expired records when the loader yields nothing
    pub use_expired_data_if_loader_not_available: bool,
    /// Key handed to the persistence layer for encrypted records
    pub encrypt_key: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DIRECTORY` - Persistence directory (default: `<tmp>/tiered_cache`)
    /// - `MAX_MB_PERSISTENCE` - Persistence size limit in MB (default: 100)
    /// - `USE_EXPIRED_DATA_IF_LOADER_NOT_AVAILABLE` - Stale fallback (default: false)
    /// - `ENCRYPT_KEY` - Encryption key for encrypted providers (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_directory: env::var("CACHE_DIRECTORY")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_directory),
            max_mb_persistence: env::var("MAX_MB_PERSISTENCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_mb_persistence),
            use_expired_data_if_loader_not_available: env::var(
                "USE_EXPIRED_DATA_IF_LOADER_NOT_AVAILABLE",
            )
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.use_expired_data_if_loader_not_available),
            encrypt_key: env::var("ENCRYPT_KEY").ok().filter(|k| !k.is_empty()),
        }
    }

    /// Checks that the configured values can drive a cache.
    pub fn validate(&self) -> Result<()> {
        if self.max_mb_persistence == 0 {
            return Err(CacheError::InvalidConfig(
                "max_mb_persistence must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_directory: env::temp_dir().join("tiered_cache"),
            max_mb_persistence: DEFAULT_MAX_MB_PERSISTENCE,
            use_expired_data_if_loader_not_available: false,
            encrypt_key: None,
        }
    }
}
