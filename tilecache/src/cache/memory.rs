//! In-memory tile cache using moka.
//!
//! Same contract as the disk cache but volatile: useful as a fast tier in
//! front of a remote source, or wherever durable storage is unavailable.
//! Moka evicts least-recently-used entries once the byte budget is exceeded
//! and drops entries older than the expiration horizon.

use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::cache::traits::{BoxFuture, CacheExpiration, PersistentCache};
use crate::coord::TileIndex;
use crate::error::TileError;

/// Longest time-to-live moka accepts; longer horizons are clamped.
const MAX_TIME_TO_LIVE: Duration = Duration::from_secs(1000 * 365 * 24 * 60 * 60);

/// In-memory tile cache bounded by total payload size.
pub struct MemoryTileCache {
    cache: MokaCache<TileIndex, Vec<u8>>,
    max_size_bytes: u64,
    expiration: CacheExpiration,
}

impl MemoryTileCache {
    /// Creates a cache holding at most `max_size_bytes` of payload.
    pub fn new(max_size_bytes: u64, expiration: CacheExpiration) -> Self {
        let mut builder = MokaCache::builder()
            // Weight each entry by its data size
            .weigher(|_key: &TileIndex, value: &Vec<u8>| -> u32 {
                value.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes);

        if let Some(horizon) = expiration.horizon() {
            builder = builder.time_to_live(horizon.min(MAX_TIME_TO_LIVE));
        }

        Self {
            cache: builder.build(),
            max_size_bytes,
            expiration,
        }
    }

    pub fn expiration(&self) -> CacheExpiration {
        self.expiration
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Weighted size of all entries (approximate until maintenance runs).
    pub fn size_bytes(&self) -> u64 {
        self.cache.weighted_size()
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs moka's pending eviction and bookkeeping tasks.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl PersistentCache for MemoryTileCache {
    fn store(&self, index: &TileIndex, data: Vec<u8>) -> BoxFuture<'_, Result<(), TileError>> {
        let index = *index;
        Box::pin(async move {
            self.cache.insert(index, data).await;
            Ok(())
        })
    }

    fn lookup(&self, index: &TileIndex) -> BoxFuture<'_, Option<Vec<u8>>> {
        let index = *index;
        Box::pin(async move { self.cache.get(&index).await })
    }

    fn remove(&self, index: &TileIndex) -> BoxFuture<'_, Result<bool, TileError>> {
        let index = *index;
        Box::pin(async move { Ok(self.cache.remove(&index).await.is_some()) })
    }
}
