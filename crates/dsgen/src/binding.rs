//! GLOBAL and VARIABLE binding tables.

use crate::error::DsgenError;
use dsgen_common::CellAddress;
use std::collections::BTreeMap;

/// A named VARIABLE field: ordered cell mappings plus an ordered value list.
///
/// The two lists are independent; output `i` reads `values[i]` (or an empty
/// string past the end) and writes it to every mapped address.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariableField {
    key: String,
    pub(crate) mappings: Vec<CellAddress>,
    pub(crate) values: Vec<String>,
}

impl VariableField {
    pub(crate) fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            mappings: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Mapped addresses in registration order.
    pub fn mappings(&self) -> &[CellAddress] {
        &self.mappings
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn is_mapped(&self, address: &CellAddress) -> bool {
        self.mappings.contains(address)
    }

    /// Value for output `index`, empty past the end of the list.
    pub fn value_for(&self, index: usize) -> &str {
        self.values.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Result of [`BindingStore::lookup`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Global,
    Variable(String),
    None,
}

/// Reference to one existing binding, used to arm a relocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingRef {
    Global(CellAddress),
    Variable { key: String, address: CellAddress },
}

impl BindingRef {
    pub fn address(&self) -> &CellAddress {
        match self {
            BindingRef::Global(address) => address,
            BindingRef::Variable { address, .. } => address,
        }
    }
}

/// Outcome of moving a VARIABLE mapping.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VariableMove {
    Moved,
    /// The target was already mapped for the key; only the source was removed.
    Merged,
    Missing,
}

/// Owns both binding tables.
///
/// Overlapping bindings are allowed: the same address may carry a GLOBAL
/// value and any number of VARIABLE mappings. [`BindingStore::lookup`]
/// reports VARIABLE first; generation writes GLOBAL first so VARIABLE wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindingStore {
    globals: BTreeMap<CellAddress, String>,
    fields: Vec<VariableField>,
}

impl BindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a GLOBAL value.
    pub fn bind_global(&mut self, address: CellAddress, value: impl Into<String>) {
        #[cfg(feature = "tracing")]
        tracing::debug!(%address, "bind global");
        self.globals.insert(address, value.into());
    }

    /// Returns the removed value, if any.
    pub fn unbind_global(&mut self, address: &CellAddress) -> Option<String> {
        #[cfg(feature = "tracing")]
        tracing::debug!(%address, "unbind global");
        self.globals.remove(address)
    }

    pub fn global(&self, address: &CellAddress) -> Option<&str> {
        self.globals.get(address).map(String::as_str)
    }

    /// GLOBAL bindings ordered by sheet, then cell reference.
    pub fn globals(&self) -> impl Iterator<Item = (&CellAddress, &str)> {
        self.globals.iter().map(|(addr, value)| (addr, value.as_str()))
    }

    pub fn global_count(&self) -> usize {
        self.globals.len()
    }

    pub fn clear_all_global(&mut self) {
        self.globals.clear();
    }

    /// Map `address` to `key`, creating the field on first use.
    ///
    /// Returns `false` when the mapping already existed; its position is kept.
    pub fn bind_variable(&mut self, key: &str, address: CellAddress) -> Result<bool, DsgenError> {
        let key = normalize_key(key)?;
        let field = self.ensure_field(key);
        if field.is_mapped(&address) {
            return Ok(false);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(key, %address, "bind variable");
        field.mappings.push(address);
        Ok(true)
    }

    /// Remove one mapping. A field left without mappings is deleted with its values.
    pub fn unbind_variable(&mut self, key: &str, address: &CellAddress) -> bool {
        let Some(pos) = self.position(key) else {
            return false;
        };
        let field = &mut self.fields[pos];
        let before = field.mappings.len();
        field.mappings.retain(|m| m != address);
        let removed = field.mappings.len() != before;
        if removed {
            #[cfg(feature = "tracing")]
            tracing::debug!(key, %address, "unbind variable");
            if field.mappings.is_empty() {
                self.fields.remove(pos);
            }
        }
        removed
    }

    /// Remove `address` from every field; returns how many fields lost a mapping.
    pub fn unbind_variable_at(&mut self, address: &CellAddress) -> usize {
        let mut touched = 0;
        self.fields.retain_mut(|field| {
            let before = field.mappings.len();
            field.mappings.retain(|m| m != address);
            if field.mappings.len() == before {
                return true;
            }
            touched += 1;
            !field.mappings.is_empty()
        });
        touched
    }

    /// Delete a field with all of its mappings and values.
    pub fn delete_field(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(pos) => {
                self.fields.remove(pos);
                true
            }
            None => false,
        }
    }

    /// First VARIABLE field (registration order) mapping `address`, else GLOBAL.
    pub fn lookup(&self, address: &CellAddress) -> BindingKind {
        if let Some(field) = self.fields.iter().find(|f| f.is_mapped(address)) {
            return BindingKind::Variable(field.key.clone());
        }
        if self.globals.contains_key(address) {
            return BindingKind::Global;
        }
        BindingKind::None
    }

    pub fn contains(&self, binding: &BindingRef) -> bool {
        match binding {
            BindingRef::Global(address) => self.globals.contains_key(address),
            BindingRef::Variable { key, address } => {
                self.field(key).is_some_and(|f| f.is_mapped(address))
            }
        }
    }

    /// Keys are matched after trimming, as when they were bound.
    pub fn field(&self, key: &str) -> Option<&VariableField> {
        self.position(key).map(|pos| &self.fields[pos])
    }

    /// Fields in registration order.
    pub fn fields(&self) -> &[VariableField] {
        &self.fields
    }

    pub fn field_keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Move a GLOBAL value from `from` to `to`; `false` if `from` is unbound.
    pub(crate) fn relocate_global(&mut self, from: &CellAddress, to: CellAddress) -> bool {
        match self.globals.remove(from) {
            Some(value) => {
                self.globals.insert(to, value);
                true
            }
            None => false,
        }
    }

    pub(crate) fn relocate_variable(
        &mut self,
        key: &str,
        from: &CellAddress,
        to: CellAddress,
    ) -> VariableMove {
        let Some(field) = self.field_mut(key) else {
            return VariableMove::Missing;
        };
        let Some(pos) = field.mappings.iter().position(|m| m == from) else {
            return VariableMove::Missing;
        };
        if field.is_mapped(&to) {
            field.mappings.remove(pos);
            VariableMove::Merged
        } else {
            field.mappings[pos] = to;
            VariableMove::Moved
        }
    }

    pub(crate) fn ensure_field(&mut self, key: &str) -> &mut VariableField {
        let key = key.trim();
        let pos = match self.position(key) {
            Some(pos) => pos,
            None => {
                self.fields.push(VariableField::new(key));
                self.fields.len() - 1
            }
        };
        &mut self.fields[pos]
    }

    pub(crate) fn field_mut(&mut self, key: &str) -> Option<&mut VariableField> {
        let pos = self.position(key)?;
        Some(&mut self.fields[pos])
    }

    pub(crate) fn push_field(&mut self, field: VariableField) {
        self.fields.push(field);
    }

    fn position(&self, key: &str) -> Option<usize> {
        let key = key.trim();
        self.fields.iter().position(|f| f.key == key)
    }
}

pub(crate) fn normalize_key(key: &str) -> Result<&str, DsgenError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(DsgenError::InvalidKey);
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(cell: &str) -> CellAddress {
        CellAddress::new("Sheet1", cell).unwrap()
    }

    #[test]
    fn global_rebind_overwrites() {
        let mut store = BindingStore::new();
        store.bind_global(addr("A1"), "first");
        store.bind_global(addr("A1"), "second");
        assert_eq!(store.global(&addr("A1")), Some("second"));
        assert_eq!(store.global_count(), 1);
        assert_eq!(store.unbind_global(&addr("A1")).as_deref(), Some("second"));
        assert_eq!(store.unbind_global(&addr("A1")), None);
    }

    #[test]
    fn globals_iterate_sorted() {
        let mut store = BindingStore::new();
        store.bind_global(CellAddress::new("Zeta", "A1").unwrap(), "z");
        store.bind_global(CellAddress::new("Alpha", "B2").unwrap(), "b");
        store.bind_global(CellAddress::new("Alpha", "A9").unwrap(), "a");
        let order: Vec<String> = store.globals().map(|(a, _)| a.to_string()).collect();
        assert_eq!(order, vec!["Alpha!A9", "Alpha!B2", "Zeta!A1"]);
    }

    #[test]
    fn bind_variable_is_idempotent_and_ordered() {
        let mut store = BindingStore::new();
        assert!(store.bind_variable("Tag", addr("B2")).unwrap());
        assert!(store.bind_variable("Tag", addr("A1")).unwrap());
        assert!(!store.bind_variable("Tag", addr("B2")).unwrap());
        let field = store.field("Tag").unwrap();
        assert_eq!(field.mappings(), &[addr("B2"), addr("A1")]);
    }

    #[test]
    fn keys_are_trimmed_and_case_sensitive() {
        let mut store = BindingStore::new();
        store.bind_variable("  Tag ", addr("A1")).unwrap();
        store.bind_variable("tag", addr("A2")).unwrap();
        assert_eq!(store.field_keys().collect::<Vec<_>>(), vec!["Tag", "tag"]);
        assert!(matches!(
            store.bind_variable("   ", addr("A3")),
            Err(DsgenError::InvalidKey)
        ));
    }

    #[test]
    fn padded_keys_reach_the_bound_field() {
        let mut store = BindingStore::new();
        store.bind_variable(" Tag ", addr("A1")).unwrap();
        store.bind_variable("Tag", addr("A2")).unwrap();
        assert!(store.has_field(" Tag"));
        assert_eq!(store.field("Tag ").unwrap().mappings().len(), 2);
        assert!(store.unbind_variable("  Tag", &addr("A1")));
        assert!(store.contains(&BindingRef::Variable {
            key: " Tag ".into(),
            address: addr("A2"),
        }));
        assert!(store.delete_field(" Tag "));
        assert!(store.fields().is_empty());
    }

    #[test]
    fn last_unbind_deletes_field_and_values() {
        let mut store = BindingStore::new();
        store.bind_variable("Tag", addr("A1")).unwrap();
        store.ensure_field("Tag").values.push("P-1".into());
        assert!(!store.unbind_variable("Tag", &addr("Z9")));
        assert!(store.unbind_variable("Tag", &addr("A1")));
        assert!(store.field("Tag").is_none());
    }

    #[test]
    fn unbind_at_touches_every_field() {
        let mut store = BindingStore::new();
        store.bind_variable("A", addr("C3")).unwrap();
        store.bind_variable("B", addr("C3")).unwrap();
        store.bind_variable("B", addr("D4")).unwrap();
        assert_eq!(store.unbind_variable_at(&addr("C3")), 2);
        assert!(!store.has_field("A"));
        assert_eq!(store.field("B").unwrap().mappings(), &[addr("D4")]);
        assert_eq!(store.unbind_variable_at(&addr("C3")), 0);
    }

    #[test]
    fn lookup_prefers_variable_in_registration_order() {
        let mut store = BindingStore::new();
        store.bind_global(addr("A1"), "g");
        assert_eq!(store.lookup(&addr("A1")), BindingKind::Global);
        store.bind_variable("Second", addr("B1")).unwrap();
        store.bind_variable("First", addr("A1")).unwrap();
        store.bind_variable("Second", addr("A1")).unwrap();
        assert_eq!(
            store.lookup(&addr("A1")),
            BindingKind::Variable("Second".into())
        );
        assert_eq!(store.lookup(&addr("Z1")), BindingKind::None);
    }

    #[test]
    fn relocate_variable_merges_onto_existing_target() {
        let mut store = BindingStore::new();
        store.bind_variable("K", addr("A1")).unwrap();
        store.bind_variable("K", addr("B1")).unwrap();
        assert_eq!(
            store.relocate_variable("K", &addr("A1"), addr("B1")),
            VariableMove::Merged
        );
        assert_eq!(store.field("K").unwrap().mappings(), &[addr("B1")]);
        assert_eq!(
            store.relocate_variable("K", &addr("A1"), addr("C1")),
            VariableMove::Missing
        );
    }

    #[test]
    fn relocate_variable_keeps_position() {
        let mut store = BindingStore::new();
        store.bind_variable("K", addr("A1")).unwrap();
        store.bind_variable("K", addr("B1")).unwrap();
        assert_eq!(
            store.relocate_variable("K", &addr("A1"), addr("C1")),
            VariableMove::Moved
        );
        assert_eq!(store.field("K").unwrap().mappings(), &[addr("C1"), addr("B1")]);
    }
}
