use std::fmt;

/// Failures raised by template backends and archivers.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("{backend} backend error: {message}")]
    Backend { backend: String, message: String },
    #[error("sheet `{0}` not found in template")]
    MissingSheet(String),
    #[error("unsupported template format `{0}`")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "zip")]
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl IoError {
    /// Wrap an arbitrary backend error, keeping its rendered message.
    pub fn from_backend<E: fmt::Display>(backend: &str, err: E) -> Self {
        IoError::Backend {
            backend: backend.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "umya")]
impl From<umya_spreadsheet::XlsxError> for IoError {
    fn from(err: umya_spreadsheet::XlsxError) -> Self {
        IoError::from_backend("umya", err)
    }
}
