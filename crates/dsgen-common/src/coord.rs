//! Grid coordinates with Excel-compatible bounds.
//!
//! `CellRef` is a 0-based (row, column) pair limited to 1,048,576 rows by
//! 16,384 columns. Its textual form is the usual `A1` notation; `$` anchors are
//! accepted on input and dropped, since binding never rebases references.

use core::fmt;
use std::str::FromStr;

use crate::address::AddressError;

pub(crate) const ROW_MAX: u32 = (1 << 20) - 1;
pub(crate) const COL_MAX: u32 = (1 << 14) - 1;

/// 0-based cell coordinate.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    row: u32,
    col: u32,
}

impl CellRef {
    /// Construct a coordinate, rejecting values past the sheet limits.
    pub fn try_new(row: u32, col: u32) -> Result<Self, AddressError> {
        if row > ROW_MAX {
            return Err(AddressError::RowOverflow(row));
        }
        if col > COL_MAX {
            return Err(AddressError::ColOverflow(col));
        }
        Ok(Self { row, col })
    }

    /// Construct from Excel 1-based coordinates.
    pub fn from_excel(row: u32, col: u32) -> Result<Self, AddressError> {
        let row0 = row.checked_sub(1).ok_or(AddressError::ZeroIndex)?;
        let col0 = col.checked_sub(1).ok_or(AddressError::ZeroIndex)?;
        Self::try_new(row0, col0)
    }

    /// Parse `B3`, `$B$3`, `b3` is rejected (columns must be uppercase).
    pub fn parse_a1(reference: &str) -> Result<Self, AddressError> {
        let malformed = || AddressError::Malformed(reference.to_string());
        let bytes = reference.as_bytes();
        let mut idx = 0;
        if bytes.get(idx) == Some(&b'$') {
            idx += 1;
        }
        let col_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
            idx += 1;
        }
        if idx == col_start {
            return Err(malformed());
        }
        let letters = &reference[col_start..idx];
        if bytes.get(idx) == Some(&b'$') {
            idx += 1;
        }
        let digits = &reference[idx..];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let col = letters_to_column(letters).ok_or_else(malformed)?;
        let row: u32 = digits.parse().map_err(|_| malformed())?;
        let row0 = row.checked_sub(1).ok_or(AddressError::ZeroIndex)?;
        Self::try_new(row0, col)
    }

    #[inline]
    pub fn row(self) -> u32 {
        self.row
    }

    #[inline]
    pub fn col(self) -> u32 {
        self.col
    }

    /// 1-based (row, column), the order most spreadsheet APIs report.
    #[inline]
    pub fn to_excel(self) -> (u32, u32) {
        (self.row + 1, self.col + 1)
    }

    /// Offset by non-negative deltas, failing past the sheet limits.
    pub fn offset(self, drow: u32, dcol: u32) -> Result<Self, AddressError> {
        let row = self
            .row
            .checked_add(drow)
            .ok_or(AddressError::RowOverflow(u32::MAX))?;
        let col = self
            .col
            .checked_add(dcol)
            .ok_or(AddressError::ColOverflow(u32::MAX))?;
        Self::try_new(row, col)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letters(self.col), self.row + 1)
    }
}

impl FromStr for CellRef {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s)
    }
}

/// `0 -> "A"`, `25 -> "Z"`, `26 -> "AA"`.
pub fn column_to_letters(mut col: u32) -> String {
    let mut buf = Vec::new();
    loop {
        let rem = (col % 26) as u8;
        buf.push(b'A' + rem);
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

/// Inverse of [`column_to_letters`]; `None` for empty or non-uppercase input.
pub fn letters_to_column(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for (idx, ch) in s.bytes().enumerate() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        let val = (ch - b'A') as u32;
        col = col.checked_mul(26)?;
        col = col.checked_add(val)?;
        if idx != s.len() - 1 {
            col = col.checked_add(1)?;
        }
    }
    Some(col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letter_roundtrip() {
        assert_eq!(column_to_letters(0), "A");
        assert_eq!(column_to_letters(27), "AB");
        assert_eq!(column_to_letters(COL_MAX), "XFD");
        assert_eq!(letters_to_column("AB"), Some(27));
        assert!(letters_to_column("a").is_none());
        assert!(letters_to_column("").is_none());
    }

    #[test]
    fn parses_plain_and_anchored_refs() {
        let b3 = CellRef::parse_a1("B3").unwrap();
        assert_eq!((b3.row(), b3.col()), (2, 1));
        assert_eq!(CellRef::parse_a1("$B$3").unwrap(), b3);
        assert_eq!(b3.to_string(), "B3");
        assert_eq!(b3.to_excel(), (3, 2));
    }

    #[test]
    fn rejects_malformed_refs() {
        for bad in ["", "3B", "B", "b3", "B0", "B3C", "B-1", "XFE1"] {
            assert!(CellRef::parse_a1(bad).is_err(), "{bad} should be rejected");
        }
        assert_eq!(CellRef::parse_a1("A0"), Err(AddressError::ZeroIndex));
    }

    #[test]
    fn offset_stays_inside_sheet_limits() {
        let c3 = CellRef::parse_a1("C3").unwrap();
        assert_eq!(c3.offset(2, 1).unwrap().to_string(), "D5");
        assert_eq!(c3.offset(ROW_MAX, 0), Err(AddressError::RowOverflow(ROW_MAX + 2)));
        assert!(c3.offset(0, u32::MAX).is_err());
    }

    #[test]
    fn excel_constructor_is_one_based() {
        assert_eq!(CellRef::from_excel(0, 1), Err(AddressError::ZeroIndex));
        assert_eq!(CellRef::from_excel(1, 1).unwrap().to_string(), "A1");
    }
}
