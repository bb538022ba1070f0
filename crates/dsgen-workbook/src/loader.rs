use crate::IoError;
use crate::traits::{OutputDocument, TemplateReader};
use dsgen_common::{CellRef, RegionRef};
use std::path::Path;

use crate::backends::{JsonDocument, JsonTemplate};
#[cfg(feature = "umya")]
use crate::backends::{UmyaDocument, UmyaTemplate};

/// Template formats recognised by [`AnyTemplate::open_path`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TemplateFormat {
    Xlsx,
    Json,
}

impl TemplateFormat {
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" => Ok(TemplateFormat::Xlsx),
            "json" => Ok(TemplateFormat::Json),
            other => Err(IoError::UnsupportedFormat(other.to_string())),
        }
    }

    /// File extension (with dot) given to generated outputs.
    pub fn extension(self) -> &'static str {
        match self {
            TemplateFormat::Xlsx => ".xlsx",
            TemplateFormat::Json => ".json",
        }
    }
}

/// Backend chosen at runtime from the file extension.
#[derive(Debug, Clone)]
pub enum AnyTemplate {
    #[cfg(feature = "umya")]
    Xlsx(UmyaTemplate),
    Json(JsonTemplate),
}

impl AnyTemplate {
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let path = path.as_ref();
        let format = TemplateFormat::from_path(path)?;
        let data = std::fs::read(path)?;
        Self::open_bytes(format, data)
    }

    pub fn open_bytes(format: TemplateFormat, data: Vec<u8>) -> Result<Self, IoError> {
        #[cfg(feature = "tracing")]
        tracing::debug!(?format, bytes = data.len(), "opening template");
        match format {
            #[cfg(feature = "umya")]
            TemplateFormat::Xlsx => UmyaTemplate::open_bytes(data)
                .map(AnyTemplate::Xlsx)
                .map_err(|e| IoError::from_backend("umya", e)),
            TemplateFormat::Json => JsonTemplate::open_bytes(&data).map(AnyTemplate::Json),
            #[allow(unreachable_patterns)]
            other => Err(IoError::UnsupportedFormat(format!("{other:?}"))),
        }
    }

    pub fn format(&self) -> TemplateFormat {
        match self {
            #[cfg(feature = "umya")]
            AnyTemplate::Xlsx(_) => TemplateFormat::Xlsx,
            AnyTemplate::Json(_) => TemplateFormat::Json,
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            #[cfg(feature = "umya")]
            AnyTemplate::Xlsx($inner) => $body.map_err(|e| IoError::from_backend("umya", e)),
            AnyTemplate::Json($inner) => $body,
        }
    };
}

impl TemplateReader for AnyTemplate {
    type Error = IoError;
    type Document = AnyDocument;

    fn backend_name(&self) -> &'static str {
        match self {
            #[cfg(feature = "umya")]
            AnyTemplate::Xlsx(t) => t.backend_name(),
            AnyTemplate::Json(t) => t.backend_name(),
        }
    }

    fn sheet_names(&self) -> Vec<String> {
        match self {
            #[cfg(feature = "umya")]
            AnyTemplate::Xlsx(t) => t.sheet_names(),
            AnyTemplate::Json(t) => t.sheet_names(),
        }
    }

    fn used_range(&self, sheet: &str) -> Result<Option<String>, Self::Error> {
        dispatch!(self, t => t.used_range(sheet))
    }

    fn merged_regions(&self, sheet: &str) -> Result<Vec<RegionRef>, Self::Error> {
        dispatch!(self, t => t.merged_regions(sheet))
    }

    fn cell_text(&self, sheet: &str, coord: CellRef) -> Result<Option<String>, Self::Error> {
        dispatch!(self, t => t.cell_text(sheet, coord))
    }

    fn fork(&self) -> Result<Self::Document, Self::Error> {
        match self {
            #[cfg(feature = "umya")]
            AnyTemplate::Xlsx(t) => t
                .fork()
                .map(AnyDocument::Xlsx)
                .map_err(|e| IoError::from_backend("umya", e)),
            AnyTemplate::Json(t) => t.fork().map(AnyDocument::Json),
        }
    }
}

/// Forked document matching [`AnyTemplate`].
#[derive(Debug)]
pub enum AnyDocument {
    #[cfg(feature = "umya")]
    Xlsx(UmyaDocument),
    Json(JsonDocument),
}

impl OutputDocument for AnyDocument {
    type Error = IoError;

    fn has_sheet(&self, sheet: &str) -> bool {
        match self {
            #[cfg(feature = "umya")]
            AnyDocument::Xlsx(d) => d.has_sheet(sheet),
            AnyDocument::Json(d) => d.has_sheet(sheet),
        }
    }

    fn set_text(&mut self, sheet: &str, coord: CellRef, value: &str) -> Result<(), Self::Error> {
        match self {
            #[cfg(feature = "umya")]
            AnyDocument::Xlsx(d) => d
                .set_text(sheet, coord, value)
                .map_err(|e| IoError::from_backend("umya", e)),
            AnyDocument::Json(d) => d.set_text(sheet, coord, value),
        }
    }

    fn to_bytes(&mut self) -> Result<Vec<u8>, Self::Error> {
        match self {
            #[cfg(feature = "umya")]
            AnyDocument::Xlsx(d) => d.to_bytes().map_err(|e| IoError::from_backend("umya", e)),
            AnyDocument::Json(d) => d.to_bytes(),
        }
    }
}
