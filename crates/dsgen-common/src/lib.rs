//! Address vocabulary shared by every dsgen crate.
//!
//! Coordinates are 0-based internally and rendered as 1-based `A1` strings.
//! A [`CellAddress`] is the unit every binding is keyed on; it compares by
//! exact `(sheet, cell)` text.

pub mod address;
pub mod coord;
pub mod grid;
pub mod range;

pub use address::{AddressError, CellAddress};
pub use coord::{CellRef, column_to_letters, letters_to_column};
pub use grid::{MergeMap, MergeSpan, build_grid};
pub use range::{MalformedRangeError, RegionRef, UsedRange, decode_used_range};
