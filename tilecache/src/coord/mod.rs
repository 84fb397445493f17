//! Tile addressing primitives.
//!
//! Provides the [`TileIndex`] key, the [`Extent`] rectangle used by the
//! tiling math, and quadkey conversions for quad-tree addressed sources
//! such as Bing Maps.

mod types;

pub use types::{Extent, TileIndex, TileInfo};

use crate::error::TileError;

/// Encodes an index as a quadkey.
///
/// Each level contributes one base-4 digit, most significant level first:
/// bit `i` of the column adds 1 and bit `i` of the row adds 2. Level 0
/// encodes to the empty string.
///
/// # Example
///
/// ```
/// use tilecache::coord::{quadkey, TileIndex};
///
/// assert_eq!(quadkey(&TileIndex::new(3, 3, 5)), "213");
/// ```
pub fn quadkey(index: &TileIndex) -> String {
    let mut key = String::with_capacity(index.zoom as usize);
    for i in (1..=index.zoom.min(32)).rev() {
        let mask = 1u32 << (i - 1);
        let mut digit = b'0';
        if index.col & mask != 0 {
            digit += 1;
        }
        if index.row & mask != 0 {
            digit += 2;
        }
        key.push(digit as char);
    }
    key
}

impl TileIndex {
    /// Decodes a quadkey back into an index.
    ///
    /// The zoom level is the key length.
    pub fn from_quadkey(key: &str) -> Result<TileIndex, TileError> {
        let zoom = u8::try_from(key.len())
            .ok()
            .filter(|z| *z <= 31)
            .ok_or_else(|| TileError::InvalidIndex {
                index: TileIndex::new(0, 0, 0),
                reason: format!("quadkey '{}' is too long", key),
            })?;

        let mut col = 0u32;
        let mut row = 0u32;
        for (i, c) in key.chars().enumerate() {
            let mask = 1u32 << (zoom as usize - 1 - i);
            match c {
                '0' => {}
                '1' => col |= mask,
                '2' => row |= mask,
                '3' => {
                    col |= mask;
                    row |= mask;
                }
                other => {
                    return Err(TileError::InvalidIndex {
                        index: TileIndex::new(zoom, col, row),
                        reason: format!("invalid quadkey digit '{}' in '{}'", other, key),
                    })
                }
            }
        }
        Ok(TileIndex::new(zoom, col, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadkey_known_values() {
        assert_eq!(quadkey(&TileIndex::new(0, 0, 0)), "");
        assert_eq!(quadkey(&TileIndex::new(1, 0, 0)), "0");
        assert_eq!(quadkey(&TileIndex::new(1, 1, 0)), "1");
        assert_eq!(quadkey(&TileIndex::new(1, 0, 1)), "2");
        assert_eq!(quadkey(&TileIndex::new(1, 1, 1)), "3");
        assert_eq!(quadkey(&TileIndex::new(3, 3, 5)), "213");
    }

    #[test]
    fn test_quadkey_length_matches_zoom() {
        let index = TileIndex::new(18, 131072, 86016);
        assert_eq!(quadkey(&index).len(), 18);
    }

    #[test]
    fn test_from_quadkey_decodes() {
        let index = TileIndex::from_quadkey("213").unwrap();
        assert_eq!(index, TileIndex::new(3, 3, 5));
    }

    #[test]
    fn test_from_quadkey_empty_is_level_zero() {
        assert_eq!(
            TileIndex::from_quadkey("").unwrap(),
            TileIndex::new(0, 0, 0)
        );
    }

    #[test]
    fn test_from_quadkey_rejects_bad_digit() {
        let result = TileIndex::from_quadkey("0124");
        assert!(matches!(result, Err(TileError::InvalidIndex { .. })));
    }

    #[test]
    fn test_flipped_row() {
        assert_eq!(TileIndex::new(0, 0, 0).flipped_row(), 0);
        assert_eq!(TileIndex::new(2, 0, 0).flipped_row(), 3);
        assert_eq!(TileIndex::new(2, 0, 3).flipped_row(), 0);
    }

    #[test]
    fn test_extent_normalizes_corners() {
        let e = Extent::new(10.0, 20.0, -10.0, -20.0);
        assert_eq!(e.min_x, -10.0);
        assert_eq!(e.min_y, -20.0);
        assert_eq!(e.max_x, 10.0);
        assert_eq!(e.max_y, 20.0);
    }

    #[test]
    fn test_extent_intersection() {
        let a = Extent::new(0.0, 0.0, 10.0, 10.0);
        let b = Extent::new(5.0, 5.0, 15.0, 15.0);
        assert_eq!(a.intersection(&b), Some(Extent::new(5.0, 5.0, 10.0, 10.0)));

        let far = Extent::new(20.0, 20.0, 30.0, 30.0);
        assert!(!a.intersects(&far));
        assert_eq!(a.intersection(&far), None);
    }

    #[test]
    fn test_touching_extents_intersect() {
        let a = Extent::new(0.0, 0.0, 10.0, 10.0);
        let b = Extent::new(10.0, 0.0, 20.0, 10.0);
        let overlap = a.intersection(&b).unwrap();
        assert_eq!(overlap.width(), 0.0);
    }

    #[test]
    fn test_extent_containment() {
        let outer = Extent::new(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains(&Extent::new(1.0, 1.0, 9.0, 9.0)));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&Extent::new(-1.0, 1.0, 9.0, 9.0)));
        assert!(outer.contains_point(0.0, 10.0));
        assert!(!outer.contains_point(10.5, 5.0));
    }

    #[test]
    fn test_tile_index_is_hashable_key() {
        let mut seen = std::collections::HashSet::new();
        assert!(seen.insert(TileIndex::new(4, 1, 2)));
        assert!(!seen.insert(TileIndex::new(4, 1, 2)));
        assert!(seen.insert(TileIndex::new(4, 2, 1)));
    }
}
