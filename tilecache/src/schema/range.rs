//! Rectangular tile ranges at one level.

use std::iter::FusedIterator;

use crate::coord::TileIndex;

/// Inclusive block of columns and rows at one zoom level.
///
/// Holds only the bounds; tiles are produced on demand by [`TileRange::iter`]
/// in row-major order, so a range may cover far more tiles than fit in
/// memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    zoom: u8,
    bounds: Option<Bounds>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    first_col: u32,
    last_col: u32,
    first_row: u32,
    last_row: u32,
}

impl TileRange {
    /// Range covering `cols.0..=cols.1` by `rows.0..=rows.1`.
    ///
    /// Reversed bounds are swapped.
    pub fn new(zoom: u8, cols: (u32, u32), rows: (u32, u32)) -> Self {
        Self {
            zoom,
            bounds: Some(Bounds {
                first_col: cols.0.min(cols.1),
                last_col: cols.0.max(cols.1),
                first_row: rows.0.min(rows.1),
                last_row: rows.0.max(rows.1),
            }),
        }
    }

    /// Range containing no tiles.
    pub fn empty(zoom: u8) -> Self {
        Self { zoom, bounds: None }
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    /// First and last column, or `None` for an empty range.
    pub fn cols(&self) -> Option<(u32, u32)> {
        self.bounds.map(|b| (b.first_col, b.last_col))
    }

    /// First and last row, or `None` for an empty range.
    pub fn rows(&self) -> Option<(u32, u32)> {
        self.bounds.map(|b| (b.first_row, b.last_row))
    }

    /// Number of columns.
    pub fn width(&self) -> u64 {
        self.bounds
            .map_or(0, |b| u64::from(b.last_col - b.first_col) + 1)
    }

    /// Number of rows.
    pub fn height(&self) -> u64 {
        self.bounds
            .map_or(0, |b| u64::from(b.last_row - b.first_row) + 1)
    }

    /// Total number of tiles, or `None` if it does not fit in a `u64`.
    pub fn tile_count(&self) -> Option<u64> {
        self.width().checked_mul(self.height())
    }

    pub fn contains(&self, index: &TileIndex) -> bool {
        self.bounds.is_some_and(|b| {
            index.zoom == self.zoom
                && (b.first_col..=b.last_col).contains(&index.col)
                && (b.first_row..=b.last_row).contains(&index.row)
        })
    }

    /// Tiles in row-major order.
    pub fn iter(&self) -> TileRangeIter {
        TileRangeIter {
            zoom: self.zoom,
            bounds: self.bounds,
            next: self.bounds.map(|b| (b.first_col, b.first_row)),
        }
    }
}

impl IntoIterator for TileRange {
    type Item = TileIndex;
    type IntoIter = TileRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &TileRange {
    type Item = TileIndex;
    type IntoIter = TileRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Row-major iterator over a [`TileRange`].
#[derive(Debug, Clone)]
pub struct TileRangeIter {
    zoom: u8,
    bounds: Option<Bounds>,
    next: Option<(u32, u32)>,
}

impl TileRangeIter {
    fn remaining(&self) -> Option<u64> {
        let (Some(b), Some((col, row))) = (self.bounds, self.next) else {
            return Some(0);
        };
        let width = u64::from(b.last_col - b.first_col) + 1;
        let rows_after = u64::from(b.last_row - row);
        rows_after
            .checked_mul(width)?
            .checked_add(u64::from(b.last_col - col) + 1)
    }
}

impl Iterator for TileRangeIter {
    type Item = TileIndex;

    fn next(&mut self) -> Option<TileIndex> {
        let b = self.bounds?;
        let (col, row) = self.next?;

        self.next = if col < b.last_col {
            Some((col + 1, row))
        } else if row < b.last_row {
            Some((b.first_col, row + 1))
        } else {
            None
        };
        Some(TileIndex::new(self.zoom, col, row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.remaining().and_then(|n| usize::try_from(n).ok()) {
            Some(n) => (n, Some(n)),
            None => (usize::MAX, None),
        }
    }
}

impl FusedIterator for TileRangeIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_order() {
        let range = TileRange::new(2, (1, 2), (0, 1));
        let tiles: Vec<_> = range.iter().collect();
        assert_eq!(
            tiles,
            vec![
                TileIndex::new(2, 1, 0),
                TileIndex::new(2, 2, 0),
                TileIndex::new(2, 1, 1),
                TileIndex::new(2, 2, 1),
            ]
        );
        assert_eq!(range.tile_count(), Some(4));
    }

    #[test]
    fn test_empty_range() {
        let range = TileRange::empty(5);
        assert!(range.is_empty());
        assert_eq!(range.tile_count(), Some(0));
        assert_eq!(range.iter().next(), None);
        assert!(!range.contains(&TileIndex::new(5, 0, 0)));
    }

    #[test]
    fn test_contains_checks_zoom() {
        let range = TileRange::new(3, (0, 7), (0, 7));
        assert!(range.contains(&TileIndex::new(3, 7, 7)));
        assert!(!range.contains(&TileIndex::new(4, 7, 7)));
        assert!(!range.contains(&TileIndex::new(3, 8, 0)));
    }

    #[test]
    fn test_full_u32_range_counts_without_overflow() {
        let range = TileRange::new(0, (0, u32::MAX), (0, u32::MAX));
        assert_eq!(range.width(), 1 << 32);
        assert_eq!(range.height(), 1 << 32);
        assert_eq!(range.tile_count(), None);

        let mut iter = range.iter();
        assert_eq!(iter.next(), Some(TileIndex::new(0, 0, 0)));
        assert_eq!(iter.next(), Some(TileIndex::new(0, 1, 0)));
        assert_eq!(iter.size_hint().1, None);
    }

    #[test]
    fn test_size_hint_tracks_progress() {
        let range = TileRange::new(1, (0, 1), (0, 1));
        let mut iter = range.iter();
        assert_eq!(iter.size_hint(), (4, Some(4)));
        iter.next();
        iter.next();
        iter.next();
        assert_eq!(iter.size_hint(), (1, Some(1)));
        iter.next();
        assert_eq!(iter.size_hint(), (0, Some(0)));
        assert_eq!(iter.next(), None);
    }
}
