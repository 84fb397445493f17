//! Tile source reading from a fixed local directory.
//!
//! Tiles live at `{directory}/{zoom}/{col}/{row}.{format}`, the same layout
//! [`DiskTileCache`] writes, so a cache directory filled by a remote source
//! can later be served offline.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{BoxFuture, CacheExpiration, DiskTileCache};
use crate::coord::{TileIndex, TileInfo};
use crate::error::TileError;
use crate::schema::TileSchema;
use crate::source::{Attribution, TileSource};

/// Local-file tile source. Never touches the network.
pub struct FileTileSource {
    name: String,
    schema: Arc<TileSchema>,
    store: DiskTileCache,
    attribution: Attribution,
}

impl FileTileSource {
    /// Serves tiles from `directory` with the given file extension.
    ///
    /// Files never expire.
    pub fn new(
        schema: impl Into<Arc<TileSchema>>,
        directory: impl Into<PathBuf>,
        format: impl Into<String>,
    ) -> Result<Self, TileError> {
        let store = DiskTileCache::new(directory, format, CacheExpiration::Never)?;
        Ok(Self::from_cache(schema, store))
    }

    /// Serves tiles from an existing disk cache, honoring its expiration.
    pub fn from_cache(schema: impl Into<Arc<TileSchema>>, store: DiskTileCache) -> Self {
        let schema = schema.into();
        Self {
            name: schema.name().to_string(),
            schema,
            store,
            attribution: Attribution::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = attribution;
        self
    }

    pub fn directory(&self) -> &std::path::Path {
        self.store.root()
    }

    /// Reads the tile at `index`.
    ///
    /// # Errors
    ///
    /// - `InvalidIndex` if the index is outside the schema
    /// - `NotFound` if no file exists at the expected location
    /// - `CacheReadCorrupt` if the file exists but cannot be read
    pub async fn read_tile(&self, index: &TileIndex) -> Result<Vec<u8>, TileError> {
        self.schema.validate_index(index)?;

        match self.store.read_entry(index).await? {
            Some(data) => Ok(data),
            None => {
                let path = self.store.tile_path(index);
                debug!(path = %path.display(), "Tile file not found");
                Err(TileError::NotFound {
                    index: *index,
                    path,
                })
            }
        }
    }
}

impl TileSource for FileTileSource {
    fn get_tile(&self, info: &TileInfo) -> BoxFuture<'_, Result<Vec<u8>, TileError>> {
        let index = info.index;
        Box::pin(async move { self.read_tile(&index).await })
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
    use std::fs;

    fn write_tile(root: &std::path::Path, index: &TileIndex, ext: &str, data: &[u8]) {
        let dir = root.join(index.zoom.to_string()).join(index.col.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.{}", index.row, ext)), data).unwrap();
    }

    fn schema() -> TileSchema {
        TileSchema::global_spherical_mercator(0, 5).unwrap()
    }

    #[tokio::test]
    async fn test_reads_existing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let index = TileIndex::new(2, 1, 3);
        write_tile(temp_dir.path(), &index, "jpg", b"jpeg bytes");

        let source = FileTileSource::new(schema(), temp_dir.path(), "jpg").unwrap();
        assert_eq!(source.read_tile(&index).await.unwrap(), b"jpeg bytes".to_vec());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = FileTileSource::new(schema(), temp_dir.path(), "png").unwrap();
        let index = TileIndex::new(1, 0, 1);

        match source.read_tile(&index).await {
            Err(TileError::NotFound { index: missing, path }) => {
                assert_eq!(missing, index);
                assert_eq!(path, temp_dir.path().join("1").join("0").join("1.png"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extension_is_part_of_the_key() {
        let temp_dir = tempfile::tempdir().unwrap();
        let index = TileIndex::new(0, 0, 0);
        write_tile(temp_dir.path(), &index, "png", b"png");

        let source = FileTileSource::new(schema(), temp_dir.path(), "jpg").unwrap();
        assert!(matches!(
            source.read_tile(&index).await,
            Err(TileError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_index_rejected_before_disk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = FileTileSource::new(schema(), temp_dir.path(), "png").unwrap();

        assert!(matches!(
            source.read_tile(&TileIndex::new(6, 0, 0)).await,
            Err(TileError::InvalidIndex { .. })
        ));
    }

    #[tokio::test]
    async fn test_as_trait_object() {
        let temp_dir = tempfile::tempdir().unwrap();
        let index = TileIndex::new(3, 5, 2);
        write_tile(temp_dir.path(), &index, "png", b"tile");

        let source: Arc<dyn TileSource> = Arc::new(
            FileTileSource::new(schema(), temp_dir.path(), "png")
                .unwrap()
                .with_name("offline"),
        );

        assert_eq!(source.name(), "offline");
        assert_eq!(source.get_tile_at(&index).await.unwrap(), b"tile".to_vec());
    }
}
