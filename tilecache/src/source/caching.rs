//! Cache-then-fetch tile source.
//!
//! Each request runs the same state machine independently:
//!
//! ```text
//! validate ──► cache lookup ──hit──► return cached bytes
//!                   │
//!                  miss
//!                   ▼
//!                fetch ──fail──► FetchFailed (cache untouched)
//!                   │
//!                  ok
//!                   ▼
//!           store (best effort) ──► return fetched bytes
//! ```
//!
//! Concurrent misses for the same index each fetch and store; the store is
//! an idempotent overwrite, so the race costs bandwidth but not correctness.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::cache::{BoxFuture, NullCache, PersistentCache};
use crate::coord::{TileIndex, TileInfo};
use crate::error::TileError;
use crate::provider::TileFetcher;
use crate::schema::TileSchema;
use crate::source::{Attribution, TileSource};

/// Tile source serving from a persistent cache and filling it from a
/// fetcher.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use tilecache::cache::{CacheExpiration, DiskTileCache};
/// use tilecache::provider::{HttpTileFetcher, UrlTemplate};
/// use tilecache::schema::TileSchema;
/// use tilecache::source::CachingTileSource;
///
/// let schema = TileSchema::global_spherical_mercator(0, 18)?;
/// let fetcher = HttpTileFetcher::new(UrlTemplate::simple("https://tile.openstreetmap.org/{z}/{x}/{y}.png")?)?;
/// let cache = DiskTileCache::new("/tmp/osm", "png", CacheExpiration::Never)?;
///
/// let source = CachingTileSource::new(schema, fetcher).with_cache(Arc::new(cache));
/// let bytes = source.fetch_tile(&TileIndex::new(3, 4, 2)).await?;
/// ```
pub struct CachingTileSource<F: TileFetcher> {
    name: String,
    schema: Arc<TileSchema>,
    fetcher: F,
    cache: Arc<dyn PersistentCache>,
    attribution: Attribution,
}

impl<F: TileFetcher> CachingTileSource<F> {
    /// Creates a source without a persistent cache.
    pub fn new(schema: impl Into<Arc<TileSchema>>, fetcher: F) -> Self {
        let schema = schema.into();
        Self {
            name: schema.name().to_string(),
            schema,
            fetcher,
            cache: Arc::new(NullCache),
            attribution: Attribution::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn PersistentCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = attribution;
        self
    }

    pub fn cache(&self) -> &Arc<dyn PersistentCache> {
        &self.cache
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn shared_schema(&self) -> Arc<TileSchema> {
        Arc::clone(&self.schema)
    }

    /// Serves the tile at `index` from the cache, fetching it on a miss.
    ///
    /// # Errors
    ///
    /// - `InvalidIndex` before any cache or network access
    /// - `FetchFailed` when the tile is not cached and the fetch fails
    ///
    /// Cache write failures are logged and do not fail the request.
    #[instrument(level = "debug", skip(self, index), fields(source = %self.name, tile = %index))]
    pub async fn fetch_tile(&self, index: &TileIndex) -> Result<Vec<u8>, TileError> {
        self.schema.validate_index(index)?;

        if let Some(data) = self.cache.lookup(index).await {
            debug!(size_bytes = data.len(), "Cache hit");
            return Ok(data);
        }
        debug!("Cache miss");

        let data = match self.fetcher.fetch(index).await {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Tile fetch failed");
                return Err(e);
            }
        };

        if let Err(e) = self.cache.store(index, data.clone()).await {
            // Caching is an optimization; the fetched tile is still served
            warn!(error = %e, "Cache write failed");
        }

        debug!(size_bytes = data.len(), "Fetched tile");
        Ok(data)
    }
}

impl<F: TileFetcher> TileSource for CachingTileSource<F> {
    fn get_tile(&self, info: &TileInfo) -> BoxFuture<'_, Result<Vec<u8>, TileError>> {
        let index = info.index;
        Box::pin(async move { self.fetch_tile(&index).await })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &TileSchema {
        &self.schema
    }

    fn attribution(&self) -> &Attribution {
        &self.attribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::cache::{CacheExpiration, DiskTileCache, MemoryTileCache};
    use crate::error::FetchError;
    use crate::provider::{HttpTileFetcher, UrlTemplate};

    /// Fetcher returning a payload derived from the index and counting calls.
    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingFetcher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TileFetcher for CountingFetcher {
        async fn fetch(&self, index: &TileIndex) -> Result<Vec<u8>, TileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TileError::FetchFailed {
                    url: format!("test://{}", index),
                    source: FetchError::Status { status: 500 },
                });
            }
            Ok(index.to_string().into_bytes())
        }
    }

    /// Cache whose writes always fail.
    struct BrokenCache;

    impl PersistentCache for BrokenCache {
        fn store(&self, index: &TileIndex, _data: Vec<u8>) -> BoxFuture<'_, Result<(), TileError>> {
            let index = *index;
            Box::pin(async move {
                Err(TileError::CacheWriteFailed {
                    index,
                    source: std::io::Error::other("read-only filesystem"),
                })
            })
        }

        fn lookup(&self, _index: &TileIndex) -> BoxFuture<'_, Option<Vec<u8>>> {
            Box::pin(async { None })
        }

        fn remove(&self, _index: &TileIndex) -> BoxFuture<'_, Result<bool, TileError>> {
            Box::pin(async { Ok(false) })
        }
    }

    fn schema() -> TileSchema {
        TileSchema::global_spherical_mercator(0, 10).unwrap()
    }

    fn memory_cache() -> Arc<MemoryTileCache> {
        Arc::new(MemoryTileCache::new(10_000_000, CacheExpiration::Never))
    }

    #[tokio::test]
    async fn test_second_request_served_from_cache() {
        let cache = memory_cache();
        let source = CachingTileSource::new(schema(), CountingFetcher::new())
            .with_cache(cache.clone());
        let index = TileIndex::new(5, 10, 12);

        let first = source.fetch_tile(&index).await.unwrap();
        let second = source.fetch_tile(&index).await.unwrap();

        assert_eq!(first, b"5/10/12".to_vec());
        assert_eq!(first, second);
        assert_eq!(source.fetcher().calls(), 1);
        assert_eq!(cache.lookup(&index).await, Some(first));
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_cache_empty() {
        let cache = memory_cache();
        let source = CachingTileSource::new(schema(), CountingFetcher::failing())
            .with_cache(cache.clone());
        let index = TileIndex::new(4, 3, 2);

        let result = source.fetch_tile(&index).await;
        assert!(matches!(result, Err(TileError::FetchFailed { .. })));
        assert!(cache.lookup(&index).await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_index_never_reaches_cache_or_fetcher() {
        let source = CachingTileSource::new(schema(), CountingFetcher::new())
            .with_cache(Arc::new(BrokenCache));

        let result = source.fetch_tile(&TileIndex::new(3, 8, 0)).await;
        assert!(matches!(result, Err(TileError::InvalidIndex { .. })));

        let result = source.fetch_tile(&TileIndex::new(11, 0, 0)).await;
        assert!(matches!(result, Err(TileError::InvalidIndex { .. })));

        assert_eq!(source.fetcher().calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_serves_tile() {
        let source = CachingTileSource::new(schema(), CountingFetcher::new())
            .with_cache(Arc::new(BrokenCache));
        let index = TileIndex::new(2, 1, 1);

        assert_eq!(source.fetch_tile(&index).await.unwrap(), b"2/1/1".to_vec());
        assert_eq!(source.fetch_tile(&index).await.unwrap(), b"2/1/1".to_vec());
        assert_eq!(source.fetcher().calls(), 2);
    }

    #[tokio::test]
    async fn test_without_cache_always_fetches() {
        let source = CachingTileSource::new(schema(), CountingFetcher::new());
        let index = TileIndex::new(1, 0, 0);

        source.fetch_tile(&index).await.unwrap();
        source.fetch_tile(&index).await.unwrap();
        assert_eq!(source.fetcher().calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let cache = Arc::new(MemoryTileCache::new(
            10_000_000,
            CacheExpiration::from_duration(Duration::from_millis(50)),
        ));
        let source = CachingTileSource::new(schema(), CountingFetcher::new()).with_cache(cache);
        let index = TileIndex::new(6, 6, 6);

        source.fetch_tile(&index).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        source.fetch_tile(&index).await.unwrap();

        assert_eq!(source.fetcher().calls(), 2);
    }

    #[tokio::test]
    async fn test_with_disk_cache_and_fetch_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache = DiskTileCache::new(temp_dir.path(), "png", CacheExpiration::Never).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let fetcher = HttpTileFetcher::with_fetch_fn(
            UrlTemplate::simple("https://tile.example.org/{z}/{x}/{y}.png").unwrap(),
            move |url: String| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(url.into_bytes())
                }
            },
        );
        let source = CachingTileSource::new(schema(), fetcher).with_cache(Arc::new(cache));
        let index = TileIndex::new(3, 2, 1);

        let first = source.fetch_tile(&index).await.unwrap();
        let second = source.fetch_tile(&index).await.unwrap();

        assert_eq!(first, b"https://tile.example.org/3/2/1.png".to_vec());
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(temp_dir.path().join("3").join("2").join("1.png").exists());
    }

    #[tokio::test]
    async fn test_cancelled_request_does_not_store() {
        let cache = memory_cache();
        let fetcher = HttpTileFetcher::with_fetch_fn(
            UrlTemplate::simple("test://{z}/{x}/{y}").unwrap(),
            |_url: String| async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(vec![1, 2, 3])
            },
        );
        let source = CachingTileSource::new(schema(), fetcher).with_cache(cache.clone());
        let index = TileIndex::new(2, 2, 2);

        let result =
            tokio::time::timeout(Duration::from_millis(20), source.fetch_tile(&index)).await;
        assert!(result.is_err(), "request should have been abandoned");
        assert!(cache.lookup(&index).await.is_none());
    }

    #[tokio::test]
    async fn test_trait_object_usage() {
        let source: Arc<dyn TileSource> = Arc::new(
            CachingTileSource::new(schema(), CountingFetcher::new())
                .with_name("counting")
                .with_attribution(Attribution::new("© test", "https://example.org")),
        );

        assert_eq!(source.name(), "counting");
        assert_eq!(source.attribution().text, "© test");

        let data = source.get_tile_at(&TileIndex::new(1, 1, 0)).await.unwrap();
        assert_eq!(data, b"1/1/0".to_vec());

        let result = source.get_tile_at(&TileIndex::new(1, 2, 0)).await;
        assert!(matches!(result, Err(TileError::InvalidIndex { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_requests_for_distinct_tiles() {
        let source = Arc::new(
            CachingTileSource::new(schema(), CountingFetcher::new()).with_cache(memory_cache()),
        );

        let infos: Vec<_> = source
            .schema()
            .tile_infos(source.schema().extent(), 3)
            .unwrap()
            .collect();
        let requests = infos.iter().map(|info| source.get_tile(info));
        let results = futures::future::join_all(requests).await;

        assert_eq!(results.len(), 64);
        for (info, result) in infos.iter().zip(results) {
            assert_eq!(result.unwrap(), info.index.to_string().into_bytes());
        }
        assert_eq!(source.fetcher().calls(), 64);
    }
}
