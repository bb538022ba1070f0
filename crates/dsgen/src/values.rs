//! Per-field value lists and the paste parser.

use crate::binding::{BindingStore, normalize_key};
use crate::error::DsgenError;

/// Split pasted spreadsheet text into trimmed, non-empty values.
///
/// Line endings are normalised first; any run of newline, tab, comma or
/// semicolon separates tokens. The result is reading order.
pub fn bulk_parse(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    normalized
        .split(['\n', '\t', ',', ';'])
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

impl BindingStore {
    /// Push one value onto `key`, creating the field if needed.
    pub fn append(&mut self, key: &str, value: &str) -> Result<(), DsgenError> {
        let key = normalize_key(key)?;
        let value = value.trim();
        if value.is_empty() {
            return Err(DsgenError::EmptyValue {
                key: key.to_string(),
            });
        }
        self.ensure_field(key).values.push(value.to_string());
        Ok(())
    }

    /// Append every value parsed from `text`; returns how many were added.
    pub fn bulk_append(&mut self, key: &str, text: &str) -> Result<usize, DsgenError> {
        let key = normalize_key(key)?;
        let parsed = bulk_parse(text);
        if parsed.is_empty() {
            return Err(DsgenError::EmptyPaste {
                key: key.to_string(),
            });
        }
        let added = parsed.len();
        #[cfg(feature = "tracing")]
        tracing::debug!(key, added, "bulk append");
        self.ensure_field(key).values.extend(parsed);
        Ok(added)
    }

    /// Remove the value at `index`; out of range or unknown key does nothing.
    pub fn delete_at(&mut self, key: &str, index: usize) -> Option<String> {
        let field = self.field_mut(key)?;
        if index < field.values.len() {
            Some(field.values.remove(index))
        } else {
            None
        }
    }

    /// Drop every value of `key`, keeping its mappings.
    pub fn clear_all(&mut self, key: &str) -> usize {
        match self.field_mut(key) {
            Some(field) => {
                let cleared = field.values.len();
                field.values.clear();
                cleared
            }
            None => 0,
        }
    }
}
