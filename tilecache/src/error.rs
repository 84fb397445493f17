//! Error types for tile addressing, caching and fetching.
//!
//! Errors fall into two groups:
//!
//! - **Construction-time**: [`TileError::SchemaConfiguration`] is raised once
//!   while building a schema, template, cache or source and never per request.
//! - **Per-request**: [`TileError::InvalidIndex`], [`TileError::FetchFailed`]
//!   and [`TileError::NotFound`] fail a single tile request. Cache faults
//!   ([`TileError::CacheWriteFailed`], [`TileError::CacheReadCorrupt`]) are
//!   absorbed by the caching pipeline and only logged.

use std::path::PathBuf;

use thiserror::Error;

use crate::coord::TileIndex;

/// Transport-level failure reported by an HTTP client or fetch override.
///
/// `Clone` so that test doubles can replay the same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status code.
    #[error("HTTP status {status}")]
    Status { status: u16 },

    /// Failure raised by a caller-supplied fetch function.
    #[error("{0}")]
    Other(String),
}

/// Errors produced by the tile engine.
#[derive(Debug, Error)]
pub enum TileError {
    /// Index outside the schema's levels or a matrix's column/row range.
    #[error("invalid tile index {index}: {reason}")]
    InvalidIndex { index: TileIndex, reason: String },

    /// Persisting a payload failed. Never fatal to a tile request.
    #[error("cache write failed for {index}: {source}")]
    CacheWriteFailed {
        index: TileIndex,
        #[source]
        source: std::io::Error,
    },

    /// A cache entry exists but cannot be read back. Treated as a miss.
    #[error("corrupt cache entry for {index}: {reason}")]
    CacheReadCorrupt { index: TileIndex, reason: String },

    /// Remote retrieval failed.
    #[error("fetch failed for {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: FetchError,
    },

    /// A file-backed source has no tile at the expected location.
    #[error("tile {index} not found at {}", path.display())]
    NotFound { index: TileIndex, path: PathBuf },

    /// Invalid schema, template, storage root or configuration value.
    #[error("configuration error: {0}")]
    SchemaConfiguration(String),
}

impl TileError {
    /// Shorthand for building a [`TileError::SchemaConfiguration`].
    pub fn config(msg: impl Into<String>) -> Self {
        TileError::SchemaConfiguration(msg.into())
    }

    /// Returns `true` for failures the caching pipeline absorbs.
    pub fn is_cache_fault(&self) -> bool {
        matches!(
            self,
            TileError::CacheWriteFailed { .. } | TileError::CacheReadCorrupt { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_failed_display_includes_url_and_cause() {
        let err = TileError::FetchFailed {
            url: "https://tile.example.com/1/0/0.png".to_string(),
            source: FetchError::Status { status: 404 },
        };
        let msg = err.to_string();
        assert!(msg.contains("https://tile.example.com/1/0/0.png"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn test_fetch_failed_exposes_source() {
        use std::error::Error;

        let err = TileError::FetchFailed {
            url: "u".to_string(),
            source: FetchError::Transport("connection reset".to_string()),
        };
        let source = err.source().expect("source should be set");
        assert!(source.to_string().contains("connection reset"));
    }

    #[test]
    fn test_not_found_display() {
        let err = TileError::NotFound {
            index: TileIndex::new(3, 1, 2),
            path: PathBuf::from("/tiles/3/1/2.png"),
        };
        let msg = err.to_string();
        assert!(msg.contains("3/1/2"));
        assert!(msg.contains("/tiles/3/1/2.png"));
    }

    #[test]
    fn test_cache_fault_classification() {
        let write = TileError::CacheWriteFailed {
            index: TileIndex::new(0, 0, 0),
            source: std::io::Error::other("disk full"),
        };
        assert!(write.is_cache_fault());
        assert!(!TileError::config("bad").is_cache_fault());
    }
}
