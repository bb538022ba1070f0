//! Dense value grids and merged-region maps.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::coord::CellRef;
use crate::range::{RegionRef, UsedRange};

/// Materialise every coordinate of `used` into a `rows x cols` grid.
///
/// Slots with no value yield an empty string, so trailing blank rows and
/// columns inside the used range are kept.
pub fn build_grid<F>(used: &UsedRange, mut value_at: F) -> Vec<Vec<String>>
where
    F: FnMut(CellRef) -> Option<String>,
{
    (0..used.rows)
        .map(|r| {
            (0..used.cols)
                .map(|c| {
                    used.coord_at(r, c)
                        .and_then(&mut value_at)
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect()
}

/// Row/column span owned by the top-left cell of a merged region.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MergeSpan {
    pub rows: u32,
    pub cols: u32,
}

/// Origins of merged regions and the coordinates they cover.
///
/// A covered coordinate has no independent address for binding purposes.
#[derive(Clone, Debug, Default)]
pub struct MergeMap {
    origins: FxHashMap<CellRef, MergeSpan>,
    covered: FxHashSet<CellRef>,
}

impl MergeMap {
    pub fn from_regions<'a, I>(regions: I) -> Self
    where
        I: IntoIterator<Item = &'a RegionRef>,
    {
        let mut map = MergeMap::default();
        for region in regions {
            map.origins.insert(
                region.start,
                MergeSpan {
                    rows: region.height(),
                    cols: region.width(),
                },
            );
            for row in region.start.row()..=region.end.row() {
                for col in region.start.col()..=region.end.col() {
                    if row == region.start.row() && col == region.start.col() {
                        continue;
                    }
                    if let Ok(coord) = CellRef::try_new(row, col) {
                        map.covered.insert(coord);
                    }
                }
            }
        }
        map
    }

    /// Span for a region origin; `None` for ordinary or covered cells.
    pub fn span_at(&self, coord: CellRef) -> Option<MergeSpan> {
        self.origins.get(&coord).copied()
    }

    pub fn is_covered(&self, coord: CellRef) -> bool {
        self.covered.contains(&coord)
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn covered_len(&self) -> usize {
        self.covered.len()
    }

    /// Coordinates in `used` that a user can address, in row-major order.
    pub fn addressable<'a>(&'a self, used: &'a UsedRange) -> impl Iterator<Item = CellRef> + 'a {
        (0..used.rows)
            .flat_map(move |r| (0..used.cols).filter_map(move |c| used.coord_at(r, c)))
            .filter(move |coord| !self.is_covered(*coord))
    }
}
