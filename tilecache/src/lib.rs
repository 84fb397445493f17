//! Tilecache - map tile addressing and caching engine
//!
//! This library maps geographic extents to tile indices and back, and serves
//! tile bytes through a persistent cache that falls back to a remote fetch.
//!
//! # Layout
//!
//! - [`coord`]: tile indices, extents and quadkeys
//! - [`schema`]: tile matrices and schemas (the tiling math)
//! - [`cache`]: persistent tile caches with time-based expiration
//! - [`provider`]: addressing templates, HTTP transports and fetchers
//! - [`source`]: cache-then-fetch and local-file tile sources
//! - [`catalog`]: preconfigured well-known services
//! - [`config`]: INI-backed source configuration
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tilecache::cache::{CacheExpiration, DiskTileCache};
//! use tilecache::catalog::{create_known_source, KnownSourceOptions, KnownTileSource};
//! use tilecache::coord::TileIndex;
//!
//! # async fn run() -> Result<(), tilecache::TileError> {
//! let cache = DiskTileCache::new("/var/cache/tiles/osm", "png", CacheExpiration::Never)?;
//! let options = KnownSourceOptions::default()
//!     .with_cache(Arc::new(cache))
//!     .with_user_agent("my-map/1.0");
//! let source = create_known_source(KnownTileSource::OpenStreetMap, options)?;
//!
//! let bytes = source.fetch_tile(&TileIndex::new(3, 4, 2)).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod coord;
pub mod error;
pub mod logging;
pub mod provider;
pub mod schema;
pub mod source;

pub use error::{FetchError, TileError};
pub use source::{CachingTileSource, FileTileSource, TileSource};
