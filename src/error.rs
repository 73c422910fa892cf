//! Error Module
//!
//! Defines the error types used throughout the cache.
//!
//! Absence (key not found, decode failure, expired record) is never an
//! error: engines return `Option::None` for it.

use thiserror::Error;

/// Boxed loader failure, kept as the source of [`CacheError::LoaderFailed`].
pub type LoaderError = Box<dyn std::error::Error + Send + Sync + 'static>;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Persistence I/O failed while writing
    #[error("Persistence I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A payload could not be encoded for persistence
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The persistence backend was asked to encrypt but cannot
    #[error("Encryption is not supported by this persistence backend (key: {0})")]
    EncryptionUnsupported(String),

    /// The loader produced no value and no cached record may be served
    #[error("The loader returned no data and there is no cached data for {provider_key}")]
    NoData {
        /// Provider whose loader came back empty
        provider_key: String,
    },

    /// The loader failed and no cached record may be served
    #[error("The loader failed and there is no cached data for {provider_key}")]
    LoaderFailed {
        /// Provider whose loader failed
        provider_key: String,
        /// What the loader reported
        #[source]
        source: LoaderError,
    },

    /// A cache request is inconsistent (e.g. evicting a dynamic key that was not supplied)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration values are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_names_provider() {
        let err = CacheError::NoData {
            provider_key: "mocks".to_string(),
        };
        assert!(err.to_string().contains("mocks"));
    }

    #[test]
    fn test_loader_failed_keeps_source() {
        let err = CacheError::LoaderFailed {
            provider_key: "mocks".to_string(),
            source: "connection reset".into(),
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("connection reset"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: CacheError = io.into();
        assert!(matches!(err, CacheError::Io(_)));
    }
}
