//! Sheet preview: value grid, merges and binding marks for one sheet.

use dsgen_common::{
    CellAddress, CellRef, MergeMap, MergeSpan, UsedRange, build_grid, decode_used_range,
};
use dsgen_workbook::{IoError, TemplateReader};

use crate::binding::{BindingKind, BindingStore};
use crate::error::DsgenError;

pub const DEFAULT_PREVIEW_ROWS: u32 = 120;
pub const DEFAULT_PREVIEW_COLS: u32 = 40;
const MIN_ROWS: u32 = 10;
const MAX_ROWS: u32 = 2000;
const MIN_COLS: u32 = 5;
const MAX_COLS: u32 = 500;

/// How much of a sheet a preview renders.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PreviewWindow {
    max_rows: u32,
    max_cols: u32,
}

impl Default for PreviewWindow {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_PREVIEW_ROWS,
            max_cols: DEFAULT_PREVIEW_COLS,
        }
    }
}

impl PreviewWindow {
    /// Clamped to 10..=2000 rows and 5..=500 columns.
    pub fn new(max_rows: u32, max_cols: u32) -> Self {
        Self {
            max_rows: max_rows.clamp(MIN_ROWS, MAX_ROWS),
            max_cols: max_cols.clamp(MIN_COLS, MAX_COLS),
        }
    }

    /// Window covering all of `used`, within the same caps.
    pub fn fit_to(used: &UsedRange) -> Self {
        Self::new(used.rows, used.cols)
    }

    pub fn max_rows(&self) -> u32 {
        self.max_rows
    }

    pub fn max_cols(&self) -> u32 {
        self.max_cols
    }

    fn limit(&self, used: &UsedRange) -> UsedRange {
        UsedRange {
            origin: used.origin,
            rows: used.rows.min(self.max_rows),
            cols: used.cols.min(self.max_cols),
        }
    }
}

/// One addressable slot of a preview.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewCell {
    pub coord: CellRef,
    pub text: String,
    pub span: Option<MergeSpan>,
    pub binding: BindingKind,
}

#[derive(Clone, Debug)]
pub struct SheetPreview {
    pub sheet: String,
    /// Full used range of the sheet.
    pub used_range: UsedRange,
    /// Portion of `used_range` actually rendered.
    pub shown: UsedRange,
    /// `shown.rows x shown.cols` cell text, blanks as empty strings.
    pub grid: Vec<Vec<String>>,
    pub merges: MergeMap,
    bindings: Vec<(CellRef, BindingKind)>,
}

impl SheetPreview {
    pub fn build<T>(
        template: &T,
        sheet: &str,
        store: &BindingStore,
        window: PreviewWindow,
    ) -> Result<Self, DsgenError>
    where
        T: TemplateReader,
        IoError: From<T::Error>,
    {
        let descriptor = template
            .used_range(sheet)
            .map_err(|e| DsgenError::Template(e.into()))?;
        let used_range = decode_used_range(descriptor.as_deref())?;
        let shown = window.limit(&used_range);
        let regions = template
            .merged_regions(sheet)
            .map_err(|e| DsgenError::Template(e.into()))?;
        let merges = MergeMap::from_regions(&regions);

        let mut read_error = None;
        let grid = build_grid(&shown, |coord| match template.cell_text(sheet, coord) {
            Ok(text) => text,
            Err(e) => {
                read_error.get_or_insert(e);
                None
            }
        });
        if let Some(e) = read_error {
            return Err(DsgenError::Template(e.into()));
        }

        let bindings = merges
            .addressable(&shown)
            .filter_map(|coord| {
                let address = CellAddress::from_coord(sheet, coord).ok()?;
                match store.lookup(&address) {
                    BindingKind::None => None,
                    kind => Some((coord, kind)),
                }
            })
            .collect();

        Ok(Self {
            sheet: sheet.to_string(),
            used_range,
            shown,
            grid,
            merges,
            bindings,
        })
    }

    /// Whether rows or columns of the sheet fall outside the window.
    pub fn is_truncated(&self) -> bool {
        self.shown.rows < self.used_range.rows || self.shown.cols < self.used_range.cols
    }

    pub fn text_at(&self, coord: CellRef) -> Option<&str> {
        let r = coord.row().checked_sub(self.shown.origin.row())?;
        let c = coord.col().checked_sub(self.shown.origin.col())?;
        self.grid
            .get(r as usize)
            .and_then(|row| row.get(c as usize))
            .map(String::as_str)
    }

    pub fn binding_at(&self, coord: CellRef) -> &BindingKind {
        self.bindings
            .iter()
            .find(|(c, _)| *c == coord)
            .map(|(_, kind)| kind)
            .unwrap_or(&BindingKind::None)
    }

    /// Addressable cells in row-major order; merge-covered slots are skipped.
    pub fn cells(&self) -> impl Iterator<Item = PreviewCell> + '_ {
        self.merges.addressable(&self.shown).map(|coord| PreviewCell {
            coord,
            text: self.text_at(coord).unwrap_or_default().to_string(),
            span: self.merges.span_at(coord),
            binding: self.binding_at(coord).clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsgen_common::MalformedRangeError;
    use dsgen_workbook::JsonTemplate;

    fn cell(a1: &str) -> CellRef {
        CellRef::parse_a1(a1).unwrap()
    }

    #[test]
    fn window_clamps_and_fits() {
        let w = PreviewWindow::new(1, 10_000);
        assert_eq!((w.max_rows(), w.max_cols()), (10, 500));
        let used = decode_used_range(Some("A1:ZZ5000")).unwrap();
        let fit = PreviewWindow::fit_to(&used);
        assert_eq!((fit.max_rows(), fit.max_cols()), (2000, 500));
        assert_eq!(PreviewWindow::default().max_rows(), 120);
    }

    #[test]
    fn preview_marks_bindings_and_skips_covered() {
        let mut t = JsonTemplate::new().with_sheet("S", Some("B2:D4"));
        t.set_cell("S", "B2", "Title").unwrap();
        t.set_cell("S", "D4", "end").unwrap();
        t.add_merge("S", "B2:C2").unwrap();
        let mut store = BindingStore::new();
        store.bind_global(CellAddress::new("S", "D4").unwrap(), "g");
        store
            .bind_variable("Tag", CellAddress::new("S", "B3").unwrap())
            .unwrap();

        let preview = SheetPreview::build(&t, "S", &store, PreviewWindow::default()).unwrap();
        assert_eq!(preview.grid.len(), 3);
        assert_eq!(preview.grid[0], vec!["Title", "", ""]);
        assert_eq!(preview.text_at(cell("D4")), Some("end"));
        assert_eq!(preview.binding_at(cell("D4")), &BindingKind::Global);
        assert_eq!(
            preview.binding_at(cell("B3")),
            &BindingKind::Variable("Tag".into())
        );

        let cells: Vec<_> = preview.cells().collect();
        assert_eq!(cells.len(), 8);
        assert!(cells.iter().all(|c| c.coord != cell("C2")));
        assert_eq!(cells[0].span, Some(MergeSpan { rows: 1, cols: 2 }));
        assert!(!preview.is_truncated());
    }

    #[test]
    fn window_limits_grid() {
        let t = JsonTemplate::new().with_sheet("S", Some("A1:Z200"));
        let preview =
            SheetPreview::build(&t, "S", &BindingStore::new(), PreviewWindow::new(10, 5)).unwrap();
        assert_eq!(preview.grid.len(), 10);
        assert_eq!(preview.grid[0].len(), 5);
        assert!(preview.is_truncated());
    }

    #[test]
    fn missing_range_is_malformed() {
        let t = JsonTemplate::new().with_sheet("S", None);
        let err = SheetPreview::build(&t, "S", &BindingStore::new(), PreviewWindow::default())
            .unwrap_err();
        assert!(matches!(
            err,
            DsgenError::MalformedRange(MalformedRangeError::Missing)
        ));
    }
}
