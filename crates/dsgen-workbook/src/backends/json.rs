use crate::IoError;
use crate::traits::{OutputDocument, TemplateReader};
use dsgen_common::{CellRef, RegionRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
struct JsonWorkbook {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    sheets: Vec<JsonSheet>,
}

fn default_version() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
struct JsonSheet {
    name: String,
    /// Declared used range, e.g. `"A1:D10"`.
    #[serde(default, rename = "ref")]
    used_range: Option<String>,
    #[serde(default)]
    merges: Vec<String>,
    /// A1 reference -> text.
    #[serde(default)]
    cells: BTreeMap<String, String>,
}

/// Plain-JSON workbook: sheets, declared ranges, merges and text cells.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JsonTemplate {
    workbook: JsonWorkbook,
}

impl JsonTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let data = fs::read(path)?;
        Self::open_bytes(&data)
    }

    pub fn open_bytes(data: &[u8]) -> Result<Self, IoError> {
        let workbook: JsonWorkbook = serde_json::from_slice(data)?;
        Ok(Self { workbook })
    }

    /// Add a sheet (no-op if it already exists) and return `self` for chaining.
    pub fn with_sheet(mut self, name: &str, used_range: Option<&str>) -> Self {
        self.add_sheet(name, used_range);
        self
    }

    pub fn add_sheet(&mut self, name: &str, used_range: Option<&str>) {
        if self.sheet_mut(name).is_some() {
            return;
        }
        self.workbook.sheets.push(JsonSheet {
            name: name.to_string(),
            used_range: used_range.map(str::to_string),
            ..Default::default()
        });
    }

    pub fn set_cell(&mut self, sheet: &str, cell: &str, value: &str) -> Result<(), IoError> {
        set_cell(&mut self.workbook, sheet, cell, value)
    }

    pub fn add_merge(&mut self, sheet: &str, region: &str) -> Result<(), IoError> {
        let ws = self
            .sheet_mut(sheet)
            .ok_or_else(|| IoError::MissingSheet(sheet.to_string()))?;
        ws.merges.push(region.to_string());
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, IoError> {
        Ok(serde_json::to_vec_pretty(&self.workbook)?)
    }

    fn sheet(&self, name: &str) -> Result<&JsonSheet, IoError> {
        self.workbook
            .sheets
            .iter()
            .find(|ws| ws.name == name)
            .ok_or_else(|| IoError::MissingSheet(name.to_string()))
    }

    fn sheet_mut(&mut self, name: &str) -> Option<&mut JsonSheet> {
        self.workbook.sheets.iter_mut().find(|ws| ws.name == name)
    }
}

fn set_cell(workbook: &mut JsonWorkbook, sheet: &str, cell: &str, value: &str) -> Result<(), IoError> {
    let ws = workbook
        .sheets
        .iter_mut()
        .find(|ws| ws.name == sheet)
        .ok_or_else(|| IoError::MissingSheet(sheet.to_string()))?;
    ws.cells.insert(cell.to_string(), value.to_string());
    Ok(())
}

impl TemplateReader for JsonTemplate {
    type Error = IoError;
    type Document = JsonDocument;

    fn backend_name(&self) -> &'static str {
        "json"
    }

    fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheets.iter().map(|ws| ws.name.clone()).collect()
    }

    fn used_range(&self, sheet: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.sheet(sheet)?.used_range.clone())
    }

    fn merged_regions(&self, sheet: &str) -> Result<Vec<RegionRef>, Self::Error> {
        Ok(self
            .sheet(sheet)?
            .merges
            .iter()
            .filter_map(|m| RegionRef::parse(m).ok())
            .collect())
    }

    fn cell_text(&self, sheet: &str, coord: CellRef) -> Result<Option<String>, Self::Error> {
        let ws = self.sheet(sheet)?;
        // Stored refs may carry anchors, so compare on the parsed coordinate.
        Ok(ws
            .cells
            .iter()
            .find(|(cell, _)| CellRef::parse_a1(cell).is_ok_and(|c| c == coord))
            .map(|(_, value)| value.clone())
            .filter(|value| !value.is_empty()))
    }

    fn fork(&self) -> Result<Self::Document, Self::Error> {
        Ok(JsonDocument {
            workbook: self.workbook.clone(),
        })
    }
}

/// Independent copy of a [`JsonTemplate`].
#[derive(Debug, Clone, PartialEq)]
pub struct JsonDocument {
    workbook: JsonWorkbook,
}

impl JsonDocument {
    /// Read back a generated document, e.g. from archive bytes.
    pub fn open_bytes(data: &[u8]) -> Result<Self, IoError> {
        Ok(Self {
            workbook: serde_json::from_slice(data)?,
        })
    }

    pub fn cell(&self, sheet: &str, cell: &str) -> Option<&str> {
        self.workbook
            .sheets
            .iter()
            .find(|ws| ws.name == sheet)
            .and_then(|ws| ws.cells.get(cell))
            .map(String::as_str)
    }
}

impl OutputDocument for JsonDocument {
    type Error = IoError;

    fn has_sheet(&self, sheet: &str) -> bool {
        self.workbook.sheets.iter().any(|ws| ws.name == sheet)
    }

    fn set_text(&mut self, sheet: &str, coord: CellRef, value: &str) -> Result<(), Self::Error> {
        let ws = self
            .workbook
            .sheets
            .iter_mut()
            .find(|ws| ws.name == sheet)
            .ok_or_else(|| IoError::MissingSheet(sheet.to_string()))?;
        // Replace any anchored spelling of the same coordinate.
        ws.cells
            .retain(|cell, _| CellRef::parse_a1(cell).map_or(true, |c| c != coord));
        ws.cells.insert(coord.to_string(), value.to_string());
        Ok(())
    }

    fn to_bytes(&mut self) -> Result<Vec<u8>, Self::Error> {
        Ok(serde_json::to_vec_pretty(&self.workbook)?)
    }
}
