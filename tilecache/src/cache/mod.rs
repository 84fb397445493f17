//! Persistent tile caches.
//!
//! All caches implement [`PersistentCache`]:
//!
//! - [`DiskTileCache`]: files under a root directory, expiration by mtime
//! - [`MemoryTileCache`]: moka-backed, bounded by payload bytes
//! - [`NullCache`]: stores nothing
//!
//! # Expiration
//!
//! Validity is checked on every lookup; an entry is returned only while its
//! age is below the horizon. There is no background sweep. Expired entries
//! are evicted when read, and [`DiskTileCache::purge_expired`] reclaims the
//! rest on demand.

mod disk;
mod memory;
mod traits;

pub use disk::{DiskTileCache, DEFAULT_MAX_CONCURRENT_IO};
pub use memory::MemoryTileCache;
pub use traits::{BoxFuture, CacheExpiration, NullCache, PersistentCache, PurgeResult};
