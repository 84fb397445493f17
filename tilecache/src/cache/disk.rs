//! On-disk tile cache with time-based expiration.
//!
//! Entries are plain files laid out as `{root}/{zoom}/{col}/{row}.{format}`.
//! The file's modification time is the write timestamp, so no metadata
//! side-file is needed.
//!
//! # Atomic Publication
//!
//! A store writes to a uniquely named temporary file next to the target and
//! renames it into place. A reader therefore sees either the previous entry
//! or the complete new one, and a store abandoned halfway leaves only a
//! temporary file behind (removed by [`DiskTileCache::purge_expired`]).
//!
//! # Disk I/O Limiting
//!
//! Reads and writes run on tokio's blocking pool behind a semaphore. Several
//! caches can share one limiter via [`DiskTileCache::with_shared_limiter`].

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::Semaphore;
use tracing::{debug, trace, warn};

use crate::cache::traits::{BoxFuture, CacheExpiration, PersistentCache, PurgeResult};
use crate::coord::TileIndex;
use crate::error::TileError;

/// Default number of concurrent disk operations per cache.
pub const DEFAULT_MAX_CONCURRENT_IO: usize = 64;

/// Marker separating the entry name from the temporary suffix.
const TEMP_MARKER: &str = ".tmp-";

/// Temporary files older than this are considered abandoned.
const STALE_TEMP_AGE: Duration = Duration::from_secs(10 * 60);

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Outcome of reading one entry from disk.
enum ReadOutcome {
    Missing,
    Expired,
    Fresh(Vec<u8>),
}

/// Persistent tile cache rooted at a directory.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use tilecache::cache::{CacheExpiration, DiskTileCache};
///
/// let cache = DiskTileCache::new(
///     "/var/cache/tiles/osm",
///     "png",
///     CacheExpiration::from_duration(Duration::from_secs(86400)),
/// )?;
/// # Ok::<(), tilecache::TileError>(())
/// ```
pub struct DiskTileCache {
    root: PathBuf,
    format: String,
    expiration: CacheExpiration,
    io_limiter: Arc<Semaphore>,
}

impl DiskTileCache {
    /// Creates a cache rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// `SchemaConfiguration` if the format tag is empty or not alphanumeric,
    /// or the root cannot be created as a directory.
    pub fn new(
        root: impl Into<PathBuf>,
        format: impl Into<String>,
        expiration: CacheExpiration,
    ) -> Result<Self, TileError> {
        let root = root.into();
        let format = format.into();

        if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TileError::config(format!(
                "invalid cache format tag '{}'",
                format
            )));
        }
        if root.as_os_str().is_empty() {
            return Err(TileError::config("cache root must not be empty"));
        }

        fs::create_dir_all(&root).map_err(|e| {
            TileError::config(format!(
                "cannot create cache root {}: {}",
                root.display(),
                e
            ))
        })?;
        if !root.is_dir() {
            return Err(TileError::config(format!(
                "cache root {} is not a directory",
                root.display()
            )));
        }

        debug!(root = %root.display(), format = %format, expiration = %expiration, "Disk tile cache ready");

        Ok(Self {
            root,
            format,
            expiration,
            io_limiter: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_IO)),
        })
    }

    /// Limits concurrent disk operations for this cache.
    ///
    /// The limit is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn with_max_concurrent_io(mut self, max_concurrent_io: usize) -> Self {
        let permits = max_concurrent_io.clamp(1, Semaphore::MAX_PERMITS);
        self.io_limiter = Arc::new(Semaphore::new(permits));
        self
    }

    /// Shares a disk I/O limiter with other caches.
    pub fn with_shared_limiter(mut self, limiter: Arc<Semaphore>) -> Self {
        self.io_limiter = limiter;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn expiration(&self) -> CacheExpiration {
        self.expiration
    }

    /// Location of the entry for `index`.
    pub fn tile_path(&self, index: &TileIndex) -> PathBuf {
        self.root
            .join(index.zoom.to_string())
            .join(index.col.to_string())
            .join(format!("{}.{}", index.row, self.format))
    }

    /// Reads an entry, distinguishing corruption from a plain miss.
    ///
    /// # Errors
    ///
    /// `CacheReadCorrupt` if the entry exists but cannot be read back.
    pub async fn read_entry(&self, index: &TileIndex) -> Result<Option<Vec<u8>>, TileError> {
        let path = self.tile_path(index);
        let expiration = self.expiration;

        let _permit = self.io_limiter.acquire().await.ok();

        let outcome = tokio::task::spawn_blocking(move || read_fresh(&path, expiration))
            .await
            .map_err(|e| TileError::CacheReadCorrupt {
                index: *index,
                reason: e.to_string(),
            })?
            .map_err(|e| TileError::CacheReadCorrupt {
                index: *index,
                reason: e.to_string(),
            })?;

        match outcome {
            ReadOutcome::Fresh(data) => Ok(Some(data)),
            ReadOutcome::Expired => {
                debug!(zoom = index.zoom, col = index.col, row = index.row, "Evicted expired tile");
                Ok(None)
            }
            ReadOutcome::Missing => Ok(None),
        }
    }

    /// Removes expired entries and abandoned temporary files.
    ///
    /// Lookups already evict expired entries lazily; this sweep reclaims
    /// space held by entries that are never read again.
    pub async fn purge_expired(&self) -> Result<PurgeResult, TileError> {
        let root = self.root.clone();
        let suffix = format!(".{}", self.format);
        let expiration = self.expiration;

        let _permit = self.io_limiter.acquire().await.ok();

        let result = tokio::task::spawn_blocking(move || {
            let mut result = PurgeResult::default();
            purge_dir(&root, &suffix, expiration, SystemTime::now(), &mut result);
            result
        })
        .await
        .map_err(|e| TileError::config(format!("purge task failed: {}", e)))?;

        debug!(
            entries_removed = result.entries_removed,
            temp_files_removed = result.temp_files_removed,
            bytes_freed = result.bytes_freed,
            "Disk tile cache purge complete"
        );
        Ok(result)
    }
}

impl PersistentCache for DiskTileCache {
    fn store(&self, index: &TileIndex, data: Vec<u8>) -> BoxFuture<'_, Result<(), TileError>> {
        let index = *index;
        let path = self.tile_path(&index);
        Box::pin(async move {
            let _permit = self.io_limiter.acquire().await.ok();

            tokio::task::spawn_blocking(move || write_atomic(&path, &data))
                .await
                .map_err(|e| io::Error::other(e.to_string()))
                .and_then(|r| r)
                .map_err(|source| TileError::CacheWriteFailed { index, source })?;

            trace!(zoom = index.zoom, col = index.col, row = index.row, "Stored tile");
            Ok(())
        })
    }

    fn lookup(&self, index: &TileIndex) -> BoxFuture<'_, Option<Vec<u8>>> {
        let index = *index;
        Box::pin(async move {
            match self.read_entry(&index).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(error = %e, path = %self.tile_path(&index).display(), "Treating unreadable cache entry as a miss");
                    None
                }
            }
        })
    }

    fn remove(&self, index: &TileIndex) -> BoxFuture<'_, Result<bool, TileError>> {
        let index = *index;
        let path = self.tile_path(&index);
        Box::pin(async move {
            let _permit = self.io_limiter.acquire().await.ok();

            tokio::task::spawn_blocking(move || match fs::remove_file(&path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e),
            })
            .await
            .map_err(|e| io::Error::other(e.to_string()))
            .and_then(|r| r)
            .map_err(|source| TileError::CacheWriteFailed { index, source })
        })
    }
}

fn read_fresh(path: &Path, expiration: CacheExpiration) -> io::Result<ReadOutcome> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ReadOutcome::Missing),
        Err(e) => return Err(e),
    };
    if !metadata.is_file() {
        return Err(io::Error::other("entry is not a regular file"));
    }

    if expiration.horizon().is_some() {
        let modified = metadata.modified()?;
        // Timestamps in the future count as freshly written
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if expiration.is_expired(age) {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(error = %e, path = %path.display(), "Failed to evict expired tile");
                }
            }
            return Ok(ReadOutcome::Expired);
        }
    }

    // A zero-length file is a stored empty payload
    match fs::read(path) {
        Ok(data) => Ok(ReadOutcome::Fresh(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ReadOutcome::Missing),
        Err(e) => Err(e),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(
        "{}{}{}-{}",
        name,
        TEMP_MARKER,
        std::process::id(),
        seq
    ))
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let written = fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(data)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

fn purge_dir(
    dir: &Path,
    suffix: &str,
    expiration: CacheExpiration,
    now: SystemTime,
    result: &mut PurgeResult,
) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if metadata.is_dir() {
            purge_dir(&path, suffix, expiration, now, result);
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or(Duration::ZERO);
        let name = entry.file_name();
        let name = name.to_string_lossy();

        let is_temp = name.contains(TEMP_MARKER);
        let remove = if is_temp {
            age >= STALE_TEMP_AGE
        } else {
            name.ends_with(suffix) && expiration.is_expired(age)
        };
        if !remove {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                result.bytes_freed += metadata.len();
                if is_temp {
                    result.temp_files_removed += 1;
                } else {
                    result.entries_removed += 1;
                }
            }
            Err(e) => warn!(error = %e, path = %path.display(), "Failed to purge cache file"),
        }
    }
}
