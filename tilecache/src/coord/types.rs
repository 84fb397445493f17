//! Value types shared by the tiling math, the caches and the fetchers.

use std::fmt;

/// Address of one tile within a schema.
///
/// Equality and hashing are structural over all three fields, so the index
/// is usable directly as a cache key.
///
/// # Example
///
/// ```
/// use tilecache::coord::TileIndex;
///
/// let index = TileIndex::new(16, 19295, 24640);
/// assert_eq!(index.to_string(), "16/19295/24640");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    /// Zoom level
    pub zoom: u8,
    /// Column (grows eastward)
    pub col: u32,
    /// Row (direction depends on the schema's y-axis)
    pub row: u32,
}

impl TileIndex {
    /// Creates a new tile index.
    pub fn new(zoom: u8, col: u32, row: u32) -> Self {
        Self { zoom, col, row }
    }

    /// Row number in the opposite y-axis convention.
    ///
    /// Only meaningful for square power-of-two grids, where the level has
    /// `2^zoom` rows. Saturates instead of wrapping for out-of-range rows.
    pub fn flipped_row(&self) -> u32 {
        let rows = 1u64 << self.zoom.min(32);
        (rows.saturating_sub(1)).saturating_sub(self.row as u64) as u32
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.col, self.row)
    }
}

/// Axis-aligned rectangle in the schema's coordinate reference.
///
/// Construction through [`Extent::new`] normalizes the corners so that
/// `min_x <= max_x` and `min_y <= max_y` always hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Creates an extent from two opposite corners.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    /// Zero-area extent at a single point.
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Returns `true` if every coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// Returns `true` if the extents overlap or touch.
    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Overlapping region, or `None` when the extents are disjoint.
    ///
    /// Touching extents intersect in a zero-width or zero-height extent.
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        if !self.intersects(other) {
            return None;
        }
        Some(Extent {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// Returns `true` if `other` lies entirely within this extent.
    pub fn contains(&self, other: &Extent) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && other.max_x <= self.max_x
            && other.max_y <= self.max_y
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.contains(&Extent::point(x, y))
    }

    /// Smallest extent covering both.
    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// Tile request descriptor: the index plus the extent it covers.
///
/// The extent is informational only; caches and fetchers key on `index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileInfo {
    pub index: TileIndex,
    pub extent: Extent,
}

impl TileInfo {
    pub fn new(index: TileIndex, extent: Extent) -> Self {
        Self { index, extent }
    }
}
