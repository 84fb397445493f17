//! Per-level grid definition.

use crate::coord::Extent;
use crate::error::TileError;

/// Direction in which row numbers grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YAxis {
    /// Origin at the top-left corner, rows grow southward (XYZ / OSM).
    #[default]
    Osm,
    /// Origin at the bottom-left corner, rows grow northward (TMS).
    Tms,
}

/// Grid definition for one zoom level.
///
/// Immutable once constructed. The origin is the corner the grid grows
/// from: top-left for [`YAxis::Osm`], bottom-left for [`YAxis::Tms`].
#[derive(Debug, Clone, PartialEq)]
pub struct TileMatrix {
    level: u8,
    identifier: String,
    resolution: f64,
    origin_x: f64,
    origin_y: f64,
    tile_width: u32,
    tile_height: u32,
    matrix_width: u32,
    matrix_height: u32,
}

impl TileMatrix {
    /// Creates a matrix with the level number as identifier.
    ///
    /// # Errors
    ///
    /// `SchemaConfiguration` if the resolution is not a positive finite
    /// number, the origin is not finite, or any dimension is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        level: u8,
        resolution: f64,
        origin: (f64, f64),
        tile_width: u32,
        tile_height: u32,
        matrix_width: u32,
        matrix_height: u32,
    ) -> Result<Self, TileError> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(TileError::config(format!(
                "level {}: resolution must be positive, got {}",
                level, resolution
            )));
        }
        if !origin.0.is_finite() || !origin.1.is_finite() {
            return Err(TileError::config(format!(
                "level {}: origin must be finite",
                level
            )));
        }
        if tile_width == 0 || tile_height == 0 {
            return Err(TileError::config(format!(
                "level {}: tile size must be at least 1x1 pixels",
                level
            )));
        }
        if matrix_width == 0 || matrix_height == 0 {
            return Err(TileError::config(format!(
                "level {}: matrix must have at least one column and one row",
                level
            )));
        }

        Ok(Self {
            level,
            identifier: level.to_string(),
            resolution,
            origin_x: origin.0,
            origin_y: origin.1,
            tile_width,
            tile_height,
            matrix_width,
            matrix_height,
        })
    }

    /// Replaces the identifier (e.g. `"EPSG:3857:4"` for WMTS matrices).
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Units per pixel.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.origin_x, self.origin_y)
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Number of columns at this level.
    pub fn matrix_width(&self) -> u32 {
        self.matrix_width
    }

    /// Number of rows at this level.
    pub fn matrix_height(&self) -> u32 {
        self.matrix_height
    }

    /// Width of one tile in map units.
    pub fn tile_span_x(&self) -> f64 {
        self.tile_width as f64 * self.resolution
    }

    /// Height of one tile in map units.
    pub fn tile_span_y(&self) -> f64 {
        self.tile_height as f64 * self.resolution
    }

    pub fn contains(&self, col: u32, row: u32) -> bool {
        col < self.matrix_width && row < self.matrix_height
    }

    /// Map extent covered by the tile at `col`/`row`.
    ///
    /// No bounds check; callers validate the index first.
    pub fn tile_extent(&self, col: u32, row: u32, y_axis: YAxis) -> Extent {
        let span_x = self.tile_span_x();
        let span_y = self.tile_span_y();
        let min_x = self.origin_x + col as f64 * span_x;

        match y_axis {
            YAxis::Osm => {
                let max_y = self.origin_y - row as f64 * span_y;
                Extent::new(min_x, max_y - span_y, min_x + span_x, max_y)
            }
            YAxis::Tms => {
                let min_y = self.origin_y + row as f64 * span_y;
                Extent::new(min_x, min_y, min_x + span_x, min_y + span_y)
            }
        }
    }

    /// Inclusive column and row ranges of the tiles touching `extent`.
    ///
    /// Returns `None` when the extent lies wholly outside the grid.
    /// Indices are floored, never rounded, and clamped to the matrix.
    pub fn tile_range(&self, extent: &Extent, y_axis: YAxis) -> Option<((u32, u32), (u32, u32))> {
        let cols = axis_range(
            extent.min_x - self.origin_x,
            extent.max_x - self.origin_x,
            self.tile_span_x(),
            self.matrix_width,
        )?;

        let (lo_y, hi_y) = match y_axis {
            YAxis::Osm => (self.origin_y - extent.max_y, self.origin_y - extent.min_y),
            YAxis::Tms => (extent.min_y - self.origin_y, extent.max_y - self.origin_y),
        };
        let rows = axis_range(lo_y, hi_y, self.tile_span_y(), self.matrix_height)?;

        Some((cols, rows))
    }
}

/// Tile numbers along one axis covering the offsets `lo..=hi` from the origin.
fn axis_range(lo: f64, hi: f64, span: f64, count: u32) -> Option<(u32, u32)> {
    if hi < 0.0 || lo > count as f64 * span {
        return None;
    }

    let max = (count - 1) as f64;
    let first = (lo / span).floor();
    // An upper edge exactly on a tile boundary does not pull in the next tile,
    // but a zero-width range still covers the tile containing it.
    let last = ((hi / span).ceil() - 1.0).max(first);

    Some((first.clamp(0.0, max) as u32, last.clamp(0.0, max) as u32))
}
