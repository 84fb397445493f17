//! Tiling schemes.
//!
//! A [`TileSchema`] aggregates one [`TileMatrix`] per zoom level together
//! with the extent the source actually covers. It answers the two questions
//! callers ask before requesting tiles:
//!
//! - which tiles intersect this extent at this level
//!   ([`TileSchema::extent_to_tile_range`])
//! - which level best matches a display resolution
//!   ([`TileSchema::nearest_level`])
//!
//! # Coordinate System
//!
//! The default global spherical-Mercator schema uses the XYZ convention:
//! - Column: 0 to 2^zoom - 1, west to east
//! - Row: 0 to 2^zoom - 1, north to south
//!
//! All math is floating point; tile numbers are obtained by flooring.

mod crs;
mod matrix;
mod range;

pub use crs::CrsIdentifier;
pub use matrix::{TileMatrix, YAxis};
pub use range::{TileRange, TileRangeIter};

use std::collections::BTreeMap;

use crate::coord::{Extent, TileIndex, TileInfo};
use crate::error::TileError;

/// Half the circumference of the spherical-Mercator world, in metres.
pub const MERCATOR_HALF_EXTENT: f64 = 20037508.342789244;

/// Tile edge length used by the global spherical-Mercator schema.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Highest level the global spherical-Mercator schema can describe.
pub const MAX_MERCATOR_ZOOM: u8 = 30;

/// Relative slack when comparing resolutions.
const RESOLUTION_TOLERANCE: f64 = 1e-9;

/// Full set of tile matrices for one tiling scheme.
///
/// Built once, read-only afterwards, and shared by every request against
/// the same source. Levels are ordered by zoom; finer levels have strictly
/// smaller resolutions.
#[derive(Debug, Clone)]
pub struct TileSchema {
    name: String,
    srs: CrsIdentifier,
    extent: Extent,
    y_axis: YAxis,
    format: String,
    matrices: BTreeMap<u8, TileMatrix>,
}

impl TileSchema {
    /// Creates a schema from explicit matrices.
    ///
    /// # Errors
    ///
    /// `SchemaConfiguration` if no matrices are given, a level repeats,
    /// resolutions do not strictly decrease with zoom, or the extent is not
    /// finite.
    pub fn new(
        name: impl Into<String>,
        srs: CrsIdentifier,
        extent: Extent,
        y_axis: YAxis,
        matrices: Vec<TileMatrix>,
    ) -> Result<Self, TileError> {
        let name = name.into();
        if matrices.is_empty() {
            return Err(TileError::config(format!(
                "schema '{}' has no tile matrices",
                name
            )));
        }
        check_extent(&name, &extent)?;

        let mut by_level = BTreeMap::new();
        for matrix in matrices {
            let level = matrix.level();
            if by_level.insert(level, matrix).is_some() {
                return Err(TileError::config(format!(
                    "schema '{}' defines level {} twice",
                    name, level
                )));
            }
        }

        let mut previous: Option<&TileMatrix> = None;
        for matrix in by_level.values() {
            if let Some(coarser) = previous {
                if matrix.resolution() >= coarser.resolution() {
                    return Err(TileError::config(format!(
                        "schema '{}': level {} (resolution {}) is not finer than level {} (resolution {})",
                        name,
                        matrix.level(),
                        matrix.resolution(),
                        coarser.level(),
                        coarser.resolution()
                    )));
                }
            }
            previous = Some(matrix);
        }

        Ok(Self {
            name,
            srs,
            extent,
            y_axis,
            format: "png".to_string(),
            matrices: by_level,
        })
    }

    /// The global spherical-Mercator (EPSG:3857) schema with 256x256 tiles.
    ///
    /// # Example
    ///
    /// ```
    /// use tilecache::schema::TileSchema;
    ///
    /// let schema = TileSchema::global_spherical_mercator(0, 18).unwrap();
    /// assert_eq!(schema.matrix_width(3), Some(8));
    /// ```
    pub fn global_spherical_mercator(min_zoom: u8, max_zoom: u8) -> Result<Self, TileError> {
        if min_zoom > max_zoom {
            return Err(TileError::config(format!(
                "min zoom {} exceeds max zoom {}",
                min_zoom, max_zoom
            )));
        }
        if max_zoom > MAX_MERCATOR_ZOOM {
            return Err(TileError::config(format!(
                "max zoom {} exceeds {}",
                max_zoom, MAX_MERCATOR_ZOOM
            )));
        }

        let world = 2.0 * MERCATOR_HALF_EXTENT;
        let matrices = (min_zoom..=max_zoom)
            .map(|zoom| {
                let tiles = 1u32 << zoom;
                let resolution = world / (DEFAULT_TILE_SIZE as f64 * tiles as f64);
                TileMatrix::new(
                    zoom,
                    resolution,
                    (-MERCATOR_HALF_EXTENT, MERCATOR_HALF_EXTENT),
                    DEFAULT_TILE_SIZE,
                    DEFAULT_TILE_SIZE,
                    tiles,
                    tiles,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(
            "GlobalSphericalMercator",
            CrsIdentifier::web_mercator(),
            Extent::new(
                -MERCATOR_HALF_EXTENT,
                -MERCATOR_HALF_EXTENT,
                MERCATOR_HALF_EXTENT,
                MERCATOR_HALF_EXTENT,
            ),
            YAxis::Osm,
            matrices,
        )
    }

    /// Narrows the content extent, for sources covering only a sub-region.
    ///
    /// # Errors
    ///
    /// `SchemaConfiguration` if the extent is not finite.
    pub fn with_extent(mut self, extent: Extent) -> Result<Self, TileError> {
        check_extent(&self.name, &extent)?;
        self.extent = extent;
        Ok(self)
    }

    /// Sets the image format tag (e.g. `"png"`, `"jpg"`).
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn srs(&self) -> &CrsIdentifier {
        &self.srs
    }

    /// Extent of the content this schema covers.
    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    pub fn y_axis(&self) -> YAxis {
        self.y_axis
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Matrices in zoom order, coarsest first.
    pub fn levels(&self) -> impl Iterator<Item = &TileMatrix> {
        self.matrices.values()
    }

    pub fn level(&self, zoom: u8) -> Option<&TileMatrix> {
        self.matrices.get(&zoom)
    }

    pub fn min_zoom(&self) -> u8 {
        self.matrices.keys().next().copied().unwrap_or_default()
    }

    pub fn max_zoom(&self) -> u8 {
        self.matrices.keys().next_back().copied().unwrap_or_default()
    }

    /// Resolutions in zoom order, coarsest first.
    pub fn resolutions(&self) -> Vec<f64> {
        self.matrices.values().map(TileMatrix::resolution).collect()
    }

    pub fn matrix_width(&self, zoom: u8) -> Option<u32> {
        self.level(zoom).map(TileMatrix::matrix_width)
    }

    pub fn matrix_height(&self, zoom: u8) -> Option<u32> {
        self.level(zoom).map(TileMatrix::matrix_height)
    }

    /// Tile pixel size `(width, height)` of the coarsest level.
    pub fn tile_size(&self) -> (u32, u32) {
        self.matrices
            .values()
            .next()
            .map(|m| (m.tile_width(), m.tile_height()))
            .unwrap_or((DEFAULT_TILE_SIZE, DEFAULT_TILE_SIZE))
    }

    /// Checks that the index addresses a tile of this schema.
    ///
    /// # Errors
    ///
    /// `InvalidIndex` for an unknown level or a column/row outside the
    /// level's matrix.
    pub fn validate_index(&self, index: &TileIndex) -> Result<&TileMatrix, TileError> {
        let matrix = self
            .level(index.zoom)
            .ok_or_else(|| TileError::InvalidIndex {
                index: *index,
                reason: format!(
                    "level {} is not in schema '{}' ({}..={})",
                    index.zoom,
                    self.name,
                    self.min_zoom(),
                    self.max_zoom()
                ),
            })?;

        if !matrix.contains(index.col, index.row) {
            return Err(TileError::InvalidIndex {
                index: *index,
                reason: format!(
                    "outside {}x{} matrix",
                    matrix.matrix_width(),
                    matrix.matrix_height()
                ),
            });
        }
        Ok(matrix)
    }

    /// Map extent covered by the tile.
    pub fn tile_to_extent(&self, index: &TileIndex) -> Result<Extent, TileError> {
        let matrix = self.validate_index(index)?;
        Ok(matrix.tile_extent(index.col, index.row, self.y_axis))
    }

    /// Tiles at `zoom` whose extents intersect `extent`.
    ///
    /// The query is first restricted to the schema extent: an extent wholly
    /// outside it yields an empty range, and a zero-area extent yields the
    /// one tile containing the point. The range is not materialized, so a
    /// whole-world query at a deep level is as cheap as a small one.
    ///
    /// # Errors
    ///
    /// `InvalidIndex` if the schema has no level `zoom`.
    pub fn extent_to_tile_range(&self, extent: &Extent, zoom: u8) -> Result<TileRange, TileError> {
        let matrix = self.level_or_invalid(zoom)?;

        let Some(clipped) = extent.intersection(&self.extent) else {
            return Ok(TileRange::empty(zoom));
        };
        Ok(match matrix.tile_range(&clipped, self.y_axis) {
            Some((cols, rows)) => TileRange::new(zoom, cols, rows),
            None => TileRange::empty(zoom),
        })
    }

    /// Like [`extent_to_tile_range`](Self::extent_to_tile_range), paired with
    /// each tile's extent. Row-major and lazy.
    pub fn tile_infos(
        &self,
        extent: &Extent,
        zoom: u8,
    ) -> Result<impl Iterator<Item = TileInfo> + '_, TileError> {
        let matrix = self.level_or_invalid(zoom)?;
        let y_axis = self.y_axis;

        Ok(self
            .extent_to_tile_range(extent, zoom)?
            .into_iter()
            .map(move |index| {
                TileInfo::new(index, matrix.tile_extent(index.col, index.row, y_axis))
            }))
    }

    fn level_or_invalid(&self, zoom: u8) -> Result<&TileMatrix, TileError> {
        self.level(zoom).ok_or_else(|| TileError::InvalidIndex {
            index: TileIndex::new(zoom, 0, 0),
            reason: format!("level {} is not in schema '{}'", zoom, self.name),
        })
    }

    /// Level whose resolution is closest to `resolution` without being
    /// coarser.
    ///
    /// Requests finer than every level get the finest level; requests
    /// coarser than every level get the coarsest.
    pub fn nearest_level(&self, resolution: f64) -> u8 {
        let limit = resolution * (1.0 + RESOLUTION_TOLERANCE);
        self.matrices
            .values()
            .find(|m| m.resolution() <= limit)
            .map(TileMatrix::level)
            .unwrap_or_else(|| self.max_zoom())
    }
}

fn check_extent(name: &str, extent: &Extent) -> Result<(), TileError> {
    if !extent.is_finite() {
        return Err(TileError::config(format!(
            "schema '{}' extent must be finite, got {}",
            name, extent
        )));
    }
    Ok(())
}
