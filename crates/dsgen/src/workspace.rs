//! One open template's bindings, naming and display settings.

use std::collections::BTreeMap;

use dsgen_common::{CellAddress, UsedRange};
use dsgen_workbook::{Archiver, IoError, OutputDocument, TemplateReader};

use crate::binding::{BindingKind, BindingRef, BindingStore, VariableField, normalize_key};
use crate::error::DsgenError;
use crate::generator::{BatchGenerator, BatchSummary, GenerationReport, GeneratorOptions};
use crate::naming::FileNamingRule;
use crate::preview::{PreviewWindow, SheetPreview};
use crate::relocation::{Relocation, RelocationOutcome};
use crate::state::{DEFAULT_KEY_FIELD, MappingEntry, PersistedState};
use crate::storage::{KeyValueStore, STATE_BACKUP_KEY, STATE_KEY};

/// Aggregate owning every piece of mutable session state.
///
/// Every mutating method either succeeds completely or returns an error with
/// the workspace untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workspace {
    bindings: BindingStore,
    naming: FileNamingRule,
    key_field: String,
    preview: PreviewWindow,
    split_left_px: Option<u32>,
    relocation: Relocation,
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            bindings: BindingStore::new(),
            naming: FileNamingRule::default(),
            key_field: DEFAULT_KEY_FIELD.to_string(),
            preview: PreviewWindow::default(),
            split_left_px: None,
            relocation: Relocation::Idle,
        }
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bindings(&self) -> &BindingStore {
        &self.bindings
    }

    pub fn naming(&self) -> &FileNamingRule {
        &self.naming
    }

    pub fn set_naming(&mut self, naming: FileNamingRule) {
        self.naming = naming;
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// Make an existing VARIABLE field the key field.
    pub fn set_key_field(&mut self, key: &str) -> Result<(), DsgenError> {
        let key = normalize_key(key)?;
        if !self.bindings.has_field(key) {
            return Err(DsgenError::UnknownField {
                key: key.to_string(),
            });
        }
        self.key_field = key.to_string();
        Ok(())
    }

    pub fn key_values(&self) -> &[String] {
        self.bindings
            .field(&self.key_field)
            .map(VariableField::values)
            .unwrap_or(&[])
    }

    pub fn preview_window(&self) -> PreviewWindow {
        self.preview
    }

    pub fn set_preview_window(&mut self, window: PreviewWindow) {
        self.preview = window;
    }

    /// Widen the window to the whole used range of a sheet.
    pub fn fit_preview(&mut self, used: &UsedRange) {
        self.preview = PreviewWindow::fit_to(used);
    }

    pub fn split_left_px(&self) -> Option<u32> {
        self.split_left_px
    }

    pub fn set_split_left_px(&mut self, px: Option<u32>) {
        self.split_left_px = px;
    }

    // GLOBAL

    pub fn bind_global(&mut self, address: CellAddress, value: impl Into<String>) {
        self.bindings.bind_global(address, value);
    }

    pub fn unbind_global(&mut self, address: &CellAddress) -> Option<String> {
        self.bindings.unbind_global(address)
    }

    pub fn clear_all_global(&mut self) {
        self.bindings.clear_all_global();
    }

    // VARIABLE

    /// Map `address` to `key`. The key becomes the key field when the
    /// current key field has no mappings.
    pub fn bind_variable(&mut self, key: &str, address: CellAddress) -> Result<bool, DsgenError> {
        let added = self.bindings.bind_variable(key, address)?;
        let current_unmapped = self
            .bindings
            .field(&self.key_field)
            .is_none_or(|f| f.mappings().is_empty());
        if current_unmapped {
            self.key_field = normalize_key(key)?.to_string();
        }
        Ok(added)
    }

    pub fn unbind_variable(&mut self, key: &str, address: &CellAddress) -> bool {
        let removed = self.bindings.unbind_variable(key, address);
        self.fallback_key_field();
        removed
    }

    /// Remove `address` from every field; returns the number of fields touched.
    pub fn unbind_variable_at(&mut self, address: &CellAddress) -> usize {
        let touched = self.bindings.unbind_variable_at(address);
        self.fallback_key_field();
        touched
    }

    pub fn delete_field(&mut self, key: &str) -> bool {
        let deleted = self.bindings.delete_field(key);
        self.fallback_key_field();
        deleted
    }

    pub fn append(&mut self, key: &str, value: &str) -> Result<(), DsgenError> {
        self.bindings.append(key, value)
    }

    pub fn bulk_append(&mut self, key: &str, text: &str) -> Result<usize, DsgenError> {
        self.bindings.bulk_append(key, text)
    }

    pub fn delete_at(&mut self, key: &str, index: usize) -> Option<String> {
        self.bindings.delete_at(key, index)
    }

    pub fn clear_all(&mut self, key: &str) -> usize {
        self.bindings.clear_all(key)
    }

    pub fn lookup(&self, address: &CellAddress) -> BindingKind {
        self.bindings.lookup(address)
    }

    // relocation

    pub fn relocation(&self) -> &Relocation {
        &self.relocation
    }

    pub fn arm_relocation(&mut self, binding: BindingRef) -> bool {
        self.relocation.arm(&self.bindings, binding)
    }

    pub fn cancel_relocation(&mut self) {
        self.relocation.cancel();
    }

    pub fn commit_relocation(&mut self, target: CellAddress) -> RelocationOutcome {
        self.relocation.commit(&mut self.bindings, target)
    }

    /// Arm and commit in one step.
    pub fn relocate(&mut self, binding: BindingRef, target: CellAddress) -> RelocationOutcome {
        if !self.arm_relocation(binding) {
            return RelocationOutcome::NotArmed;
        }
        self.commit_relocation(target)
    }

    // template-facing

    pub fn sheet_preview<T>(&self, template: &T, sheet: &str) -> Result<SheetPreview, DsgenError>
    where
        T: TemplateReader,
        IoError: From<T::Error>,
    {
        SheetPreview::build(template, sheet, &self.bindings, self.preview)
    }

    pub fn generator<'a, T>(&'a self, template: &'a T) -> BatchGenerator<'a, T>
    where
        T: TemplateReader,
        IoError: From<T::Error> + From<<T::Document as OutputDocument>::Error>,
    {
        BatchGenerator::new(template, &self.bindings, &self.naming, &self.key_field)
    }

    pub fn generate<T>(
        &self,
        template: &T,
        options: &mut GeneratorOptions,
    ) -> Result<GenerationReport, DsgenError>
    where
        T: TemplateReader,
        IoError: From<T::Error> + From<<T::Document as OutputDocument>::Error>,
    {
        self.generator(template).run(options)
    }

    pub fn generate_into<T, A>(
        &self,
        template: &T,
        options: &mut GeneratorOptions,
        archiver: &mut A,
    ) -> Result<BatchSummary, DsgenError>
    where
        T: TemplateReader,
        IoError: From<T::Error> + From<<T::Document as OutputDocument>::Error>,
        A: Archiver + ?Sized,
    {
        self.generator(template).run_into(options, archiver)
    }

    /// Names the next batch would produce, truncated for display.
    pub fn file_name_preview(&self, extension: &str) -> Vec<String> {
        self.naming.preview(self.key_values(), extension)
    }

    pub fn archive_name(&self) -> String {
        self.naming.archive_name()
    }

    // persistence

    pub fn to_state(&self) -> PersistedState {
        let mut global_edits: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for (address, value) in self.bindings.globals() {
            global_edits
                .entry(address.sheet().to_string())
                .or_default()
                .insert(address.cell().to_string(), value.to_string());
        }
        let fields = self.bindings.fields();
        PersistedState {
            global_edits,
            variable_mappings: fields
                .iter()
                .map(|f| {
                    let entries = f
                        .mappings()
                        .iter()
                        .map(|a| MappingEntry {
                            sheet_name: a.sheet().to_string(),
                            addr: a.cell().to_string(),
                        })
                        .collect();
                    (f.key().to_string(), entries)
                })
                .collect(),
            variable_values: fields
                .iter()
                .map(|f| (f.key().to_string(), f.values().to_vec()))
                .collect(),
            file_name_prefix: self.naming.prefix.clone(),
            file_name_suffix: self.naming.suffix.clone(),
            file_name_field: self.key_field.clone(),
            preview_max_r: self.preview.max_rows(),
            preview_max_c: self.preview.max_cols(),
            split_left_px: self.split_left_px,
        }
    }

    /// Rebuild from a saved state. Malformed addresses and blank keys are
    /// dropped rather than failing the whole load.
    pub fn from_state(state: PersistedState) -> Self {
        let mut bindings = BindingStore::new();
        for (sheet, cells) in state.global_edits {
            for (cell, value) in cells {
                match CellAddress::new(sheet.as_str(), cell.as_str()) {
                    Ok(address) => bindings.bind_global(address, value),
                    Err(_err) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(%sheet, %cell, error = %_err, "dropping saved GLOBAL binding");
                    }
                }
            }
        }
        for (key, entries) in state.variable_mappings {
            let Ok(key) = normalize_key(&key) else {
                continue;
            };
            let mut field = VariableField::new(key);
            for entry in entries {
                match CellAddress::new(entry.sheet_name, entry.addr) {
                    Ok(address) if !field.is_mapped(&address) => field.mappings.push(address),
                    Ok(_) => {}
                    Err(_err) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(key, error = %_err, "dropping saved VARIABLE mapping");
                    }
                }
            }
            if !bindings.has_field(key) {
                bindings.push_field(field);
            }
        }
        for (key, values) in state.variable_values {
            let Ok(key) = normalize_key(&key) else {
                continue;
            };
            bindings.ensure_field(key).values = values;
        }

        let key_field = match state.file_name_field.trim() {
            "" => DEFAULT_KEY_FIELD.to_string(),
            key => key.to_string(),
        };
        Self {
            bindings,
            naming: FileNamingRule::new(state.file_name_prefix, state.file_name_suffix),
            key_field,
            preview: PreviewWindow::new(state.preview_max_r, state.preview_max_c),
            split_left_px: state.split_left_px,
            relocation: Relocation::Idle,
        }
    }

    /// Load the saved session; an absent entry gives a fresh workspace.
    ///
    /// An entry that is not a JSON object of the saved shape is copied to
    /// [`STATE_BACKUP_KEY`] before a fresh workspace is returned, so a later
    /// save cannot destroy it.
    pub fn load<S: KeyValueStore + ?Sized>(store: &mut S) -> Result<Self, DsgenError> {
        let Some(raw) = store.get(STATE_KEY)? else {
            return Ok(Self::new());
        };
        match PersistedState::from_json(&raw) {
            Ok(state) => Ok(Self::from_state(state)),
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, "saved state is unreadable, backed up and starting fresh");
                store.set(STATE_BACKUP_KEY, &raw)?;
                Ok(Self::new())
            }
        }
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), DsgenError> {
        store.set(STATE_KEY, &self.to_state().to_json()?)?;
        Ok(())
    }

    /// Restore every default and drop the saved session.
    pub fn reset<S: KeyValueStore + ?Sized>(&mut self, store: &mut S) -> Result<(), DsgenError> {
        store.remove(STATE_KEY)?;
        *self = Self::new();
        #[cfg(feature = "tracing")]
        tracing::info!("workspace reset");
        Ok(())
    }

    fn fallback_key_field(&mut self) {
        if !self.bindings.has_field(&self.key_field) {
            #[cfg(feature = "tracing")]
            tracing::debug!(from = %self.key_field, "key field reset to default");
            self.key_field = DEFAULT_KEY_FIELD.to_string();
        }
    }
}
