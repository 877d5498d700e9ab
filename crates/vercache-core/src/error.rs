//! Error taxonomy shared by every layer of the cache.

use thiserror::Error;

/// Result type for cache layer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure to turn a dependency into an identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// A key column needed for the identity holds no value.
    #[error("column '{column}' of '{table}' is NULL, cannot build a cache identity")]
    NullColumn { table: String, column: String },

    /// A row was described without any key column.
    #[error("'{table}' row has no key columns")]
    NoKeyColumns { table: String },
}

/// Failures of the version counter store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// Reading one or more versions failed.
    #[error("failed to read versions: {0}")]
    Get(String),

    /// Incrementing a version failed.
    #[error("failed to increment version of '{key}': {reason}")]
    Increment { key: String, reason: String },

    /// The master version could neither be read nor installed.
    #[error("master version unavailable: {0}")]
    MasterVersion(String),

    /// Resetting the counter store failed.
    #[error("failed to flush versions: {0}")]
    Flush(String),

    /// Caching was switched off through the master version.
    #[error("caching is disabled by the version store")]
    CacheDisabled,
}

/// Failures of the payload store and codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Reading from the cache store failed.
    #[error("cache read failed: {0}")]
    Get(String),

    /// Writing to the cache store failed.
    #[error("cache write failed: {0}")]
    Add(String),

    /// Another writer stored the key first.
    #[error("cache key already exists: {0}")]
    KeyAlreadyExists(String),

    /// Failed to encode a payload.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Failed to decode a stored payload.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

/// Any failure raised by the cache layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl Error {
    /// Whether this is the administrative "caching disabled" signal rather than a fault.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Version(VersionError::CacheDisabled))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}
