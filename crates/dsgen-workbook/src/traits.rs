use dsgen_common::{CellRef, RegionRef};

/// Read-only view of a template plus the ability to fork it.
///
/// Implementations must make [`TemplateReader::fork`] produce a fully
/// independent copy: writing to one forked document never shows up in the
/// template or in any other fork.
pub trait TemplateReader {
    type Error: std::error::Error + Send + Sync + 'static;
    type Document: OutputDocument;

    /// Short backend label used in error messages.
    fn backend_name(&self) -> &'static str;

    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    fn has_sheet(&self, sheet: &str) -> bool {
        self.sheet_names().iter().any(|name| name == sheet)
    }

    /// Raw used-range descriptor (`"A1:D10"`), `None` when the sheet declares none.
    fn used_range(&self, sheet: &str) -> Result<Option<String>, Self::Error>;

    fn merged_regions(&self, sheet: &str) -> Result<Vec<RegionRef>, Self::Error>;

    /// Display text of a cell, `None` for blanks.
    fn cell_text(&self, sheet: &str, coord: CellRef) -> Result<Option<String>, Self::Error>;

    fn fork(&self) -> Result<Self::Document, Self::Error>;
}

/// A forked template being rewritten for one output.
pub trait OutputDocument {
    type Error: std::error::Error + Send + Sync + 'static;

    fn has_sheet(&self, sheet: &str) -> bool;

    /// Overwrite a cell with a literal string value.
    fn set_text(&mut self, sheet: &str, coord: CellRef, value: &str) -> Result<(), Self::Error>;

    /// Serialise into the backend's binary format.
    fn to_bytes(&mut self) -> Result<Vec<u8>, Self::Error>;
}
