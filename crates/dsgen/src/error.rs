use dsgen_common::{AddressError, MalformedRangeError};
use dsgen_workbook::IoError;

/// Every failure an engine operation can report.
///
/// Operations that return one of these leave the workspace unchanged.
#[derive(Debug, thiserror::Error)]
pub enum DsgenError {
    #[error(transparent)]
    MalformedRange(#[from] MalformedRangeError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("field key must not be empty")]
    InvalidKey,
    #[error("no VARIABLE field named `{key}`")]
    UnknownField { key: String },
    #[error("value for `{key}` is empty")]
    EmptyValue { key: String },
    #[error("pasted text for `{key}` contains no values")]
    EmptyPaste { key: String },
    #[error("key field `{key}` needs at least one value (currently {count})")]
    NoGenerationTarget { key: String, count: usize },
    #[error("item {index} (`{file_name}`) failed: {source}")]
    ItemFailed {
        index: usize,
        file_name: String,
        #[source]
        source: IoError,
    },
    #[error("generation cancelled after {completed} item(s)")]
    Cancelled { completed: usize },
    #[error("profile `{name}` already exists")]
    DuplicateProfile { name: String },
    #[error("profile `{name}` not found")]
    ProfileNotFound { name: String },
    #[error("invalid profile document: {reason}")]
    InvalidProfileFormat { reason: String },
    #[error("template error: {0}")]
    Template(#[source] IoError),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
