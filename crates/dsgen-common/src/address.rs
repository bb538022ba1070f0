//! Sheet-scoped cell addresses.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::coord::{CellRef, COL_MAX, ROW_MAX};

/// Errors produced while building coordinates or addresses.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum AddressError {
    #[error("row and column indices must be 1-based (>= 1)")]
    ZeroIndex,
    #[error("row {0} exceeds {max}", max = ROW_MAX)]
    RowOverflow(u32),
    #[error("col {0} exceeds {max}", max = COL_MAX)]
    ColOverflow(u32),
    #[error("`{0}` is not an A1-style cell reference")]
    Malformed(String),
    #[error("sheet name must not be empty")]
    EmptySheet,
}

/// `(sheet, cell)` pair that a binding is attached to.
///
/// Equality is textual: `B3` and `$B$3` are distinct addresses even though
/// both resolve to the same coordinate.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "AddressRepr", into = "AddressRepr")
)]
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    sheet: String,
    cell: String,
    coord: CellRef,
}

impl CellAddress {
    /// Validate that `cell` is a well-formed A1 reference and build the address.
    pub fn new(sheet: impl Into<String>, cell: impl Into<String>) -> Result<Self, AddressError> {
        let sheet = sheet.into();
        let cell = cell.into();
        if sheet.is_empty() {
            return Err(AddressError::EmptySheet);
        }
        let coord = CellRef::parse_a1(&cell)?;
        Ok(Self { sheet, cell, coord })
    }

    /// Address for a coordinate, rendered without anchors.
    pub fn from_coord(sheet: impl Into<String>, coord: CellRef) -> Result<Self, AddressError> {
        Self::new(sheet, coord.to_string())
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// The cell reference exactly as it was bound.
    pub fn cell(&self) -> &str {
        &self.cell
    }

    pub fn coord(&self) -> CellRef {
        self.coord
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.cell)
    }
}

/// Wire shape `{ "sheetName": .., "addr": .. }`.
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct AddressRepr {
    #[serde(rename = "sheetName")]
    sheet_name: String,
    addr: String,
}

#[cfg(feature = "serde")]
impl TryFrom<AddressRepr> for CellAddress {
    type Error = AddressError;

    fn try_from(value: AddressRepr) -> Result<Self, Self::Error> {
        CellAddress::new(value.sheet_name, value.addr)
    }
}

#[cfg(feature = "serde")]
impl From<CellAddress> for AddressRepr {
    fn from(value: CellAddress) -> Self {
        AddressRepr {
            sheet_name: value.sheet,
            addr: value.cell,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_textual() {
        let plain = CellAddress::new("Sheet1", "B3").unwrap();
        let anchored = CellAddress::new("Sheet1", "$B$3").unwrap();
        assert_ne!(plain, anchored);
        assert_eq!(plain.coord(), anchored.coord());
        assert_eq!(plain.to_string(), "Sheet1!B3");
    }

    #[test]
    fn rejects_bad_parts() {
        assert_eq!(
            CellAddress::new("", "A1").unwrap_err(),
            AddressError::EmptySheet
        );
        assert!(matches!(
            CellAddress::new("Sheet1", "nope"),
            Err(AddressError::Malformed(_))
        ));
    }

    #[test]
    fn ordering_is_sheet_then_cell() {
        let mut addrs = vec![
            CellAddress::new("B", "A1").unwrap(),
            CellAddress::new("A", "C2").unwrap(),
            CellAddress::new("A", "B9").unwrap(),
        ];
        addrs.sort();
        let rendered: Vec<String> = addrs.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["A!B9", "A!C2", "B!A1"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_sheet_name_and_addr() {
        let addr = CellAddress::new("Data", "C4").unwrap();
        let json = serde_json::to_value(&addr).unwrap();
        assert_eq!(json, serde_json::json!({"sheetName": "Data", "addr": "C4"}));
        let back: CellAddress = serde_json::from_value(json).unwrap();
        assert_eq!(back, addr);
        let bad = serde_json::from_value::<CellAddress>(
            serde_json::json!({"sheetName": "Data", "addr": "??"}),
        );
        assert!(bad.is_err());
    }
}
