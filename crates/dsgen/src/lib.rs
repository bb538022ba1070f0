//! Template binding and batch generation.
//!
//! A [`Workspace`] records which template cells receive a fixed GLOBAL value
//! and which belong to a VARIABLE field whose value list yields one output
//! per entry. [`BatchGenerator`] forks the template once per key-field value,
//! substitutes every binding and hands the documents to an
//! [`Archiver`](dsgen_workbook::Archiver).
//!
//! ```no_run
//! use dsgen::{CellAddress, GeneratorOptions, Workspace};
//! use dsgen_workbook::{AnyTemplate, ZipArchiver};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let template = AnyTemplate::open_path("datasheet.xlsx")?;
//! let mut ws = Workspace::new();
//! ws.bind_global(CellAddress::new("Cover", "B2")?, "Acme Plant");
//! ws.bind_variable("ItemNo", CellAddress::new("Cover", "C4")?)?;
//! ws.bulk_append("ItemNo", "P-101\nP-102\nP-103")?;
//!
//! let mut zip = ZipArchiver::new();
//! ws.generate_into(&template, &mut GeneratorOptions::default(), &mut zip)?;
//! zip.finish_to_path(ws.archive_name())?;
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod error;
pub mod generator;
pub mod naming;
pub mod preview;
pub mod profile;
pub mod relocation;
pub mod state;
pub mod storage;
pub mod values;
pub mod workspace;

pub use binding::{BindingKind, BindingRef, BindingStore, VariableField};
pub use error::DsgenError;
pub use generator::{
    BatchGenerator, BatchSummary, DuplicateNamePolicy, GeneratedFile, GenerationProgress,
    GenerationReport, GeneratorOptions,
};
pub use naming::{FileNamingRule, sanitize};
pub use preview::{PreviewCell, PreviewWindow, SheetPreview};
pub use profile::{Profile, ProfileStore};
pub use relocation::{Relocation, RelocationOutcome};
pub use state::{DEFAULT_KEY_FIELD, PersistedState};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use values::bulk_parse;
pub use workspace::Workspace;

pub use dsgen_common::{CellAddress, CellRef};
