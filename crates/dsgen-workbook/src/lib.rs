//! Template documents in, generated documents and archives out.
//!
//! The dsgen engine only needs a handful of capabilities from a spreadsheet
//! library: list sheets, read each sheet's used range, merged regions and cell
//! text, and fork the template into an independent document it can rewrite
//! and serialise. [`TemplateReader`] and [`OutputDocument`] describe that
//! seam; the backends implement it over `umya-spreadsheet` (xlsx) and a plain
//! JSON workbook used by tests and tooling.

pub mod archive;
pub mod backends;
pub mod error;
pub mod loader;
pub mod traits;

#[cfg(feature = "zip")]
pub use archive::ZipArchiver;
pub use archive::{Archiver, MemoryArchive};
pub use backends::{JsonDocument, JsonTemplate};
#[cfg(feature = "umya")]
pub use backends::{UmyaDocument, UmyaTemplate};
pub use error::IoError;
pub use loader::{AnyDocument, AnyTemplate, TemplateFormat};
pub use traits::{OutputDocument, TemplateReader};

pub use dsgen_common::{CellAddress, CellRef, RegionRef};
