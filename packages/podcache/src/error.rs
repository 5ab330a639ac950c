//! Typed errors for the podcast cache core.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur during cache and sync operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Upstream directory fetch failed
    #[error("directory error: {0}")]
    Directory(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A batch upsert failed; none of the listed identifiers is guaranteed persisted
    #[error("batch write failed for {} identifiers: {source}", identifiers.len())]
    BatchWrite {
        identifiers: Vec<String>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Scoring oracle unavailable or failed
    #[error("oracle error: {0}")]
    Oracle(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CacheError {
    /// Wrap any error as a directory failure.
    pub fn directory(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Directory(err.into())
    }

    /// Wrap any error as a storage failure.
    pub fn storage(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage(err.into())
    }

    /// Wrap any error as an oracle failure.
    pub fn oracle(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Oracle(err.into())
    }
}

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
