//! Error types for cache I/O and entry decoding
//!
//! None of these escape the public `Cache` API: every operation converts them into a
//! miss or a no-op and, when logging is enabled, reports them through `tracing`.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by caller-supplied payload converters
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while reading, writing or decoding cache entries
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache file exists but could not be read
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache file was read but is not valid JSON
    #[error("malformed cache file {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Creating the cache directory or writing a cache file failed
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The payload could not be converted into its generic form
    #[error("failed to serialize entry: {0}")]
    Serialization(String),

    /// Removing a cache file or directory failed
    #[error("failed to delete {}: {source}", path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored record is missing fields, has bad timestamps or a payload the
    /// converter rejected
    #[error("failed to deserialize entry: {0}")]
    Deserialization(String),

    /// The directory supplier could not provide a storage root
    #[error("no temporary storage root is available")]
    NoTemporaryRoot,
}

impl CacheError {
    /// Short label for the failure category, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::Read { .. } | CacheError::Malformed { .. } => "read",
            CacheError::Write { .. } | CacheError::Serialization(_) => "write",
            CacheError::Delete { .. } => "delete",
            CacheError::Deserialization(_) => "deserialization",
            CacheError::NoTemporaryRoot => "directory",
        }
    }
}
