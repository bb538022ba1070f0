//! Output file names.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PREFIX: &str = "PROJECT_";
pub const DEFAULT_SUFFIX: &str = "_Datasheet";
const PREVIEW_LIMIT: usize = 10;

/// Prefix and suffix wrapped around each output's key value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNamingRule {
    pub prefix: String,
    pub suffix: String,
}

impl Default for FileNamingRule {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

impl FileNamingRule {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// File name for output `index` (0-based) whose key value is `value`.
    pub fn file_name(&self, index: usize, value: &str, extension: &str) -> String {
        let trimmed = value.trim();
        let core = if trimmed.is_empty() {
            placeholder(index)
        } else {
            trimmed.to_string()
        };
        sanitize(&format!("{}{core}{}{extension}", self.prefix, self.suffix))
    }

    /// Name of the archive bundling a batch; `_OUTPUT.zip` even for a blank rule.
    pub fn archive_name(&self) -> String {
        sanitize(&format!("{}{}_OUTPUT.zip", self.prefix, self.suffix))
    }

    /// First names a batch over `values` would produce, plus a trailer line
    /// when more are hidden.
    pub fn preview<S: AsRef<str>>(&self, values: &[S], extension: &str) -> Vec<String> {
        let mut lines: Vec<String> = values
            .iter()
            .take(PREVIEW_LIMIT)
            .enumerate()
            .map(|(i, v)| self.file_name(i, v.as_ref(), extension))
            .collect();
        if values.len() > PREVIEW_LIMIT {
            lines.push(format!("... (+{} more)", values.len() - PREVIEW_LIMIT));
        }
        lines
    }
}

/// `DS_001` style stand-in for an empty key value.
pub fn placeholder(index: usize) -> String {
    format!("DS_{:03}", index + 1)
}

/// Replace path-hostile characters, collapse whitespace and trim.
pub fn sanitize(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|ch| match ch {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}
