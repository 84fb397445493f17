//! Core trait for persistent tile caches.
//!
//! The `PersistentCache` trait is the single seam between the caching
//! pipeline and its storage. Implementations own their backing storage
//! exclusively.
//!
//! # Design Principles
//!
//! - **Tile keys**: entries are addressed by [`TileIndex`]; each backend
//!   derives its own collision-free storage key from all three fields
//! - **Vec<u8> values**: raw bytes, no decoding
//! - **Misses absorb faults**: expired, missing and unreadable entries all
//!   look the same to the caller
//! - **Dyn-compatible**: uses `Pin<Box<dyn Future>>` for `Arc<dyn PersistentCache>`

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::coord::TileIndex;
use crate::error::TileError;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How long a stored entry stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheExpiration {
    /// Entries never expire.
    #[default]
    Never,
    /// Entries older than the horizon are stale.
    After(Duration),
}

impl CacheExpiration {
    /// Builds an expiration from a horizon.
    ///
    /// A zero or maximal duration disables expiration.
    pub fn from_duration(horizon: Duration) -> Self {
        if horizon.is_zero() || horizon == Duration::MAX {
            CacheExpiration::Never
        } else {
            CacheExpiration::After(horizon)
        }
    }

    pub fn horizon(&self) -> Option<Duration> {
        match self {
            CacheExpiration::Never => None,
            CacheExpiration::After(horizon) => Some(*horizon),
        }
    }

    /// An entry of this age may no longer be returned.
    pub fn is_expired(&self, age: Duration) -> bool {
        match self {
            CacheExpiration::Never => false,
            CacheExpiration::After(horizon) => age >= *horizon,
        }
    }
}

impl fmt::Display for CacheExpiration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheExpiration::Never => write!(f, "never"),
            CacheExpiration::After(horizon) => write!(f, "after {}s", horizon.as_secs()),
        }
    }
}

/// Result of a manual sweep over a cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeResult {
    /// Number of expired entries removed.
    pub entries_removed: usize,
    /// Number of abandoned temporary files removed.
    pub temp_files_removed: usize,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

impl fmt::Display for PurgeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Purge: removed {} entries and {} temp files, freed {} bytes",
            self.entries_removed, self.temp_files_removed, self.bytes_freed
        )
    }
}

/// Key-value store for tile payloads with time-based expiration.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Concurrent stores to
/// different keys must not interfere; concurrent stores to the same key
/// resolve last-write-wins and never expose a partial payload.
pub trait PersistentCache: Send + Sync {
    /// Persist `data` under `index`, stamped with the current time.
    ///
    /// Overwrites any earlier entry for the same index.
    ///
    /// # Errors
    ///
    /// `CacheWriteFailed` if the payload could not be persisted. Callers
    /// may continue as if no cache were present.
    fn store(&self, index: &TileIndex, data: Vec<u8>) -> BoxFuture<'_, Result<(), TileError>>;

    /// Payload for `index` if present and not expired.
    ///
    /// Expired entries may be evicted by this call. Unreadable entries are
    /// reported as `None`.
    fn lookup(&self, index: &TileIndex) -> BoxFuture<'_, Option<Vec<u8>>>;

    /// Delete the entry for `index`.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if an entry existed and was deleted
    /// - `Ok(false)` if there was nothing to delete
    fn remove(&self, index: &TileIndex) -> BoxFuture<'_, Result<bool, TileError>>;
}

/// Cache that stores nothing and never hits.
///
/// Used by sources built without a persistent cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl PersistentCache for NullCache {
    fn store(&self, _index: &TileIndex, _data: Vec<u8>) -> BoxFuture<'_, Result<(), TileError>> {
        Box::pin(async { Ok(()) })
    }

    fn lookup(&self, _index: &TileIndex) -> BoxFuture<'_, Option<Vec<u8>>> {
        Box::pin(async { None })
    }

    fn remove(&self, _index: &TileIndex) -> BoxFuture<'_, Result<bool, TileError>> {
        Box::pin(async { Ok(false) })
    }
}
