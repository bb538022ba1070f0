use crate::address::AddressError;
use crate::coord::CellRef;

/// The used-range descriptor of a sheet was absent or could not be parsed.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum MalformedRangeError {
    #[error("sheet declares no used range")]
    Missing,
    #[error("invalid range descriptor `{descriptor}`: {source}")]
    Invalid {
        descriptor: String,
        #[source]
        source: AddressError,
    },
    #[error("range descriptor `{0}` is not ordered top-left to bottom-right")]
    Inverted(String),
}

/// Inclusive rectangular region, e.g. a merged block or a used range.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct RegionRef {
    pub start: CellRef,
    pub end: CellRef,
}

impl RegionRef {
    pub fn new(start: CellRef, end: CellRef) -> Result<Self, MalformedRangeError> {
        if start.row() > end.row() || start.col() > end.col() {
            return Err(MalformedRangeError::Inverted(format!("{start}:{end}")));
        }
        Ok(Self { start, end })
    }

    /// Parse `A1:D10` or a single-cell `B2`.
    pub fn parse(descriptor: &str) -> Result<Self, MalformedRangeError> {
        let trimmed = descriptor.trim();
        let invalid = |source| MalformedRangeError::Invalid {
            descriptor: descriptor.to_string(),
            source,
        };
        let (start, end) = match trimmed.split_once(':') {
            Some((lhs, rhs)) => (
                CellRef::parse_a1(lhs).map_err(invalid)?,
                CellRef::parse_a1(rhs).map_err(invalid)?,
            ),
            None => {
                let single = CellRef::parse_a1(trimmed).map_err(invalid)?;
                (single, single)
            }
        };
        if start.row() > end.row() || start.col() > end.col() {
            return Err(MalformedRangeError::Inverted(descriptor.to_string()));
        }
        Ok(Self { start, end })
    }

    pub fn height(&self) -> u32 {
        self.end.row() - self.start.row() + 1
    }

    pub fn width(&self) -> u32 {
        self.end.col() - self.start.col() + 1
    }

    pub fn contains(&self, coord: CellRef) -> bool {
        coord.row() >= self.start.row()
            && coord.row() <= self.end.row()
            && coord.col() >= self.start.col()
            && coord.col() <= self.end.col()
    }
}

/// Rectangular extent a sheet declares as holding data, blanks included.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UsedRange {
    pub origin: CellRef,
    pub rows: u32,
    pub cols: u32,
}

impl UsedRange {
    /// Coordinate of grid slot `(r, c)`, relative to the origin.
    pub fn coord_at(&self, r: u32, c: u32) -> Option<CellRef> {
        if r >= self.rows || c >= self.cols {
            return None;
        }
        self.origin.offset(r, c).ok()
    }

    pub fn region(&self) -> RegionRef {
        let end = self
            .origin
            .offset(self.rows.saturating_sub(1), self.cols.saturating_sub(1))
            .unwrap_or(self.origin);
        RegionRef {
            start: self.origin,
            end,
        }
    }
}

impl From<RegionRef> for UsedRange {
    fn from(region: RegionRef) -> Self {
        UsedRange {
            origin: region.start,
            rows: region.height(),
            cols: region.width(),
        }
    }
}

/// Decode a sheet's used-range descriptor into inclusive extents.
pub fn decode_used_range(descriptor: Option<&str>) -> Result<UsedRange, MalformedRangeError> {
    let descriptor = descriptor
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or(MalformedRangeError::Missing)?;
    RegionRef::parse(descriptor).map(UsedRange::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_rectangular_descriptor() {
        let used = decode_used_range(Some("A1:D10")).unwrap();
        assert_eq!((used.rows, used.cols), (10, 4));
        assert_eq!(used.origin, CellRef::try_new(0, 0).unwrap());
    }

    #[test]
    fn single_cell_descriptor_is_one_by_one() {
        let used = decode_used_range(Some("C3")).unwrap();
        assert_eq!((used.rows, used.cols), (1, 1));
        assert_eq!(used.coord_at(0, 0).unwrap().to_string(), "C3");
        assert!(used.coord_at(1, 0).is_none());
    }

    #[test]
    fn offset_origin_maps_grid_slots() {
        let used = decode_used_range(Some("B2:C4")).unwrap();
        assert_eq!(used.coord_at(2, 1).unwrap().to_string(), "C4");
        assert_eq!(used.region().end.to_string(), "C4");
    }

    #[test]
    fn missing_and_garbage_descriptors_fail() {
        assert_eq!(decode_used_range(None), Err(MalformedRangeError::Missing));
        assert_eq!(
            decode_used_range(Some("  ")),
            Err(MalformedRangeError::Missing)
        );
        assert!(matches!(
            decode_used_range(Some("A1:??")),
            Err(MalformedRangeError::Invalid { .. })
        ));
        assert!(matches!(
            decode_used_range(Some("D4:A1")),
            Err(MalformedRangeError::Inverted(_))
        ));
    }
}
