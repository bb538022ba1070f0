//! JSON shape of a saved workspace.
//!
//! ```json
//! {
//!   "globalEdits": { "Sheet1": { "B2": "Acme" } },
//!   "variableMappings": { "ItemNo": [{ "sheetName": "Sheet1", "addr": "C4" }] },
//!   "variableValues": { "ItemNo": ["P-1", "P-2"] },
//!   "fileNamePrefix": "PROJECT_",
//!   "fileNameSuffix": "_Datasheet",
//!   "fileNameField": "ItemNo",
//!   "previewMaxR": 120,
//!   "previewMaxC": 40,
//!   "splitLeftPx": 420
//! }
//! ```
//!
//! Every field is optional on load, and a scalar that is `null` or of the
//! wrong type takes its default instead of failing the document. Field maps
//! keep document order so field registration order survives a save/load cycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::naming::{DEFAULT_PREFIX, DEFAULT_SUFFIX};
use crate::preview::{DEFAULT_PREVIEW_COLS, DEFAULT_PREVIEW_ROWS};

pub const DEFAULT_KEY_FIELD: &str = "ItemNo";

/// `{ sheetName, addr }` exactly as stored; validated when restored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    #[serde(rename = "sheetName")]
    pub sheet_name: String,
    pub addr: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedState {
    /// sheet -> cell -> value
    pub global_edits: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(with = "ordered")]
    pub variable_mappings: Vec<(String, Vec<MappingEntry>)>,
    #[serde(with = "ordered")]
    pub variable_values: Vec<(String, Vec<String>)>,
    #[serde(deserialize_with = "lenient::prefix")]
    pub file_name_prefix: String,
    #[serde(deserialize_with = "lenient::suffix")]
    pub file_name_suffix: String,
    #[serde(deserialize_with = "lenient::key_field")]
    pub file_name_field: String,
    #[serde(deserialize_with = "lenient::preview_rows")]
    pub preview_max_r: u32,
    #[serde(deserialize_with = "lenient::preview_cols")]
    pub preview_max_c: u32,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_px"
    )]
    pub split_left_px: Option<u32>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            global_edits: BTreeMap::new(),
            variable_mappings: Vec::new(),
            variable_values: Vec::new(),
            file_name_prefix: DEFAULT_PREFIX.to_string(),
            file_name_suffix: DEFAULT_SUFFIX.to_string(),
            file_name_field: DEFAULT_KEY_FIELD.to_string(),
            preview_max_r: DEFAULT_PREVIEW_ROWS,
            preview_max_c: DEFAULT_PREVIEW_COLS,
            split_left_px: None,
        }
    }
}

impl PersistedState {
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Scalar fields read through `serde_json::Value` so a bad value falls back.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::DEFAULT_KEY_FIELD;
    use crate::naming::{DEFAULT_PREFIX, DEFAULT_SUFFIX};
    use crate::preview::{DEFAULT_PREVIEW_COLS, DEFAULT_PREVIEW_ROWS};

    /// Non-negative finite numbers (or numeric strings), rounded.
    fn to_u32(value: Value) -> Option<u32> {
        let n = match value {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (n.is_finite() && n >= 0.0).then(|| n.round().min(f64::from(u32::MAX)) as u32)
    }

    fn to_text(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn preview_rows<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(to_u32(Value::deserialize(d)?).unwrap_or(DEFAULT_PREVIEW_ROWS))
    }

    pub fn preview_cols<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(to_u32(Value::deserialize(d)?).unwrap_or(DEFAULT_PREVIEW_COLS))
    }

    pub fn optional_px<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(to_u32(Value::deserialize(d)?))
    }

    pub fn prefix<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(to_text(Value::deserialize(d)?).unwrap_or_else(|| DEFAULT_PREFIX.to_string()))
    }

    pub fn suffix<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(to_text(Value::deserialize(d)?).unwrap_or_else(|| DEFAULT_SUFFIX.to_string()))
    }

    pub fn key_field<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(to_text(Value::deserialize(d)?).unwrap_or_else(|| DEFAULT_KEY_FIELD.to_string()))
    }
}

/// JSON object <-> `Vec<(String, V)>` in document order.
///
/// A repeated key keeps its first position and takes the last value.
pub(crate) mod ordered {
    use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
    use serde::ser::{Serialize, SerializeMap, Serializer};
    use std::fmt;
    use std::marker::PhantomData;

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S, V>(entries: &Vec<(String, V)>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }

    struct OrderedVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a JSON object")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut out: Vec<(String, V)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry::<String, V>()? {
                match out.iter_mut().find(|(existing, _)| *existing == key) {
                    Some(slot) => slot.1 = value,
                    None => out.push((key, value)),
                }
            }
            Ok(out)
        }
    }
}
