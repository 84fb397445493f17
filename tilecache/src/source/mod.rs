//! Tile sources: "given an index, produce bytes or fail".
//!
//! Variants are selected by composition rather than inheritance:
//!
//! - [`CachingTileSource`]: persistent cache in front of any [`TileFetcher`]
//!   (remote HTTP, a fetch override, or a test double)
//! - [`FileTileSource`]: tiles read from a fixed local directory
//!
//! Hosts hold sources as `Arc<dyn TileSource>` and drive many requests
//! concurrently; requests share nothing but the read-only schema and the
//! cache.
//!
//! [`TileFetcher`]: crate::provider::TileFetcher

mod caching;
mod file;

pub use caching::CachingTileSource;
pub use file::FileTileSource;

/// Caching source over HTTP, as built by the catalog and configuration
/// factories.
pub type RemoteTileSource = CachingTileSource<HttpTileFetcher<HttpTransport>>;

use crate::cache::BoxFuture;
use crate::coord::{TileIndex, TileInfo};
use crate::error::TileError;
use crate::provider::{HttpTileFetcher, HttpTransport};
use crate::schema::TileSchema;

/// Credit line a source requires when its tiles are displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribution {
    pub text: String,
    pub url: String,
}

impl Attribution {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.url.is_empty()
    }
}

/// Anything that can produce the bytes of a tile.
///
/// # Cancellation
///
/// Dropping the returned future abandons the request. Implementations only
/// publish cache entries atomically, so an abandoned request never leaves a
/// partial entry behind.
pub trait TileSource: Send + Sync {
    /// Produces the tile described by `info`.
    ///
    /// The extent in `info` is informational; the index selects the tile.
    fn get_tile(&self, info: &TileInfo) -> BoxFuture<'_, Result<Vec<u8>, TileError>>;

    fn name(&self) -> &str;

    fn schema(&self) -> &TileSchema;

    fn attribution(&self) -> &Attribution;

    /// Produces the tile at `index`, deriving its extent from the schema.
    fn get_tile_at(&self, index: &TileIndex) -> BoxFuture<'_, Result<Vec<u8>, TileError>> {
        match self.schema().tile_to_extent(index) {
            Ok(extent) => self.get_tile(&TileInfo::new(*index, extent)),
            Err(e) => Box::pin(async move { Err(e) }),
        }
    }
}
