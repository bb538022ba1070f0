use crate::traits::{OutputDocument, TemplateReader};
use dsgen_common::{CellRef, RegionRef};
use std::io::Cursor;
use std::path::Path;
use umya_spreadsheet::{Spreadsheet, XlsxError, reader::xlsx};

/// xlsx template held fully deserialised in memory.
#[derive(Clone, Debug)]
pub struct UmyaTemplate {
    book: Spreadsheet,
}

impl UmyaTemplate {
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, XlsxError> {
        // Full read so forks never hit lazily deserialised sheets.
        let book = xlsx::read(path.as_ref())?;
        Ok(Self { book })
    }

    pub fn open_bytes(data: Vec<u8>) -> Result<Self, XlsxError> {
        let book = xlsx::read_reader(Cursor::new(data), true)?;
        Ok(Self { book })
    }

    pub fn spreadsheet(&self) -> &Spreadsheet {
        &self.book
    }

    fn sheet(&self, sheet: &str) -> Result<&umya_spreadsheet::Worksheet, XlsxError> {
        self.book
            .get_sheet_by_name(sheet)
            .ok_or_else(|| XlsxError::CellError(format!("sheet `{sheet}` not found")))
    }
}

impl TemplateReader for UmyaTemplate {
    type Error = XlsxError;
    type Document = UmyaDocument;

    fn backend_name(&self) -> &'static str {
        "umya"
    }

    fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|ws| ws.get_name().to_string())
            .collect()
    }

    /// Bounding box of every stored cell, e.g. `C3:D5` for content that does
    /// not start at A1.
    fn used_range(&self, sheet: &str) -> Result<Option<String>, Self::Error> {
        let ws = self.sheet(sheet)?;
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for cell in ws.get_cell_collection() {
            let coord = cell.get_coordinate();
            let (row, col) = (*coord.get_row_num(), *coord.get_col_num());
            bounds = Some(match bounds {
                None => (row, col, row, col),
                Some((r0, c0, r1, c1)) => (r0.min(row), c0.min(col), r1.max(row), c1.max(col)),
            });
        }
        let Some((r0, c0, r1, c1)) = bounds else {
            return Ok(None);
        };
        let corner = |row, col| {
            CellRef::from_excel(row, col).map_err(|e| XlsxError::CellError(e.to_string()))
        };
        Ok(Some(format!("{}:{}", corner(r0, c0)?, corner(r1, c1)?)))
    }

    fn merged_regions(&self, sheet: &str) -> Result<Vec<RegionRef>, Self::Error> {
        let ws = self.sheet(sheet)?;
        Ok(ws
            .get_merge_cells()
            .iter()
            .filter_map(|range| RegionRef::parse(&range.get_range()).ok())
            .collect())
    }

    fn cell_text(&self, sheet: &str, coord: CellRef) -> Result<Option<String>, Self::Error> {
        let ws = self.sheet(sheet)?;
        let (row, col) = coord.to_excel();
        // umya addresses cells as (col, row)
        let text = ws.get_value((col, row));
        Ok(if text.is_empty() { None } else { Some(text) })
    }

    fn fork(&self) -> Result<Self::Document, Self::Error> {
        Ok(UmyaDocument {
            book: self.book.clone(),
        })
    }
}

/// Independent copy of an [`UmyaTemplate`].
#[derive(Debug)]
pub struct UmyaDocument {
    book: Spreadsheet,
}

impl UmyaDocument {
    pub fn spreadsheet(&self) -> &Spreadsheet {
        &self.book
    }
}

impl OutputDocument for UmyaDocument {
    type Error = XlsxError;

    fn has_sheet(&self, sheet: &str) -> bool {
        self.book.get_sheet_by_name(sheet).is_some()
    }

    fn set_text(&mut self, sheet: &str, coord: CellRef, value: &str) -> Result<(), Self::Error> {
        let ws = self
            .book
            .get_sheet_by_name_mut(sheet)
            .ok_or_else(|| XlsxError::CellError(format!("sheet `{sheet}` not found")))?;
        let (row, col) = coord.to_excel();
        ws.get_cell_mut((col, row)).set_value_string(value);
        Ok(())
    }

    fn to_bytes(&mut self) -> Result<Vec<u8>, Self::Error> {
        let mut buf = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&self.book, &mut buf)?;
        Ok(buf.into_inner())
    }
}
