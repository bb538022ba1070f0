//! Batch generation: one forked document per key-field value.
//!
//! Items are built strictly in index order on the calling thread. Every item
//! is collected before anything reaches an archiver, so a failing item never
//! leaves a partial archive behind.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dsgen_common::CellAddress;
use dsgen_workbook::{Archiver, IoError, OutputDocument, TemplateReader};

use crate::binding::BindingStore;
use crate::error::DsgenError;
use crate::naming::FileNamingRule;

pub const DEFAULT_EXTENSION: &str = ".xlsx";

/// How two items with the same sanitized file name are handled.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DuplicateNamePolicy {
    /// Later items replace earlier ones in the archive.
    #[default]
    Overwrite,
    /// Later items get ` (2)`, ` (3)`, ... before the extension.
    Suffix,
}

/// Reported after each finished item.
#[derive(Debug, Clone, Copy)]
pub struct GenerationProgress<'a> {
    pub index: usize,
    pub completed: usize,
    pub total: usize,
    pub file_name: &'a str,
}

pub type ProgressCallback = Box<dyn FnMut(GenerationProgress<'_>)>;

pub struct GeneratorOptions {
    /// Extension (with dot) appended to every file name.
    pub extension: String,
    pub duplicate_names: DuplicateNamePolicy,
    pub progress: Option<ProgressCallback>,
    /// Checked before each item; setting it stops the batch with `Cancelled`.
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            duplicate_names: DuplicateNamePolicy::default(),
            progress: None,
            cancel_flag: None,
        }
    }
}

impl GeneratorOptions {
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

impl std::fmt::Debug for GeneratorOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorOptions")
            .field("extension", &self.extension)
            .field("duplicate_names", &self.duplicate_names)
            .field("progress", &self.progress.is_some())
            .field("cancel_flag", &self.cancel_flag)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub index: usize,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Everything a finished batch produced.
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub files: Vec<GeneratedFile>,
    /// Sheets named by a binding but absent from the template.
    pub skipped_sheets: BTreeSet<String>,
}

impl GenerationReport {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.file_name.as_str())
    }

    /// Hand every file to `archiver` in index order.
    pub fn archive_into<A: Archiver + ?Sized>(self, archiver: &mut A) -> Result<usize, IoError> {
        let count = self.files.len();
        for file in self.files {
            archiver.add(&file.file_name, file.bytes)?;
        }
        Ok(count)
    }
}

/// What [`BatchGenerator::run_into`] handed to the archiver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub file_names: Vec<String>,
    pub skipped_sheets: BTreeSet<String>,
}

/// Materialises outputs from one template and one binding snapshot.
pub struct BatchGenerator<'a, T> {
    template: &'a T,
    bindings: &'a BindingStore,
    naming: &'a FileNamingRule,
    key_field: &'a str,
}

impl<'a, T> BatchGenerator<'a, T>
where
    T: TemplateReader,
    IoError: From<T::Error> + From<<T::Document as OutputDocument>::Error>,
{
    pub fn new(
        template: &'a T,
        bindings: &'a BindingStore,
        naming: &'a FileNamingRule,
        key_field: &'a str,
    ) -> Self {
        Self {
            template,
            bindings,
            naming,
            key_field,
        }
    }

    /// Number of items a run would build, or `NoGenerationTarget`.
    pub fn item_count(&self) -> Result<usize, DsgenError> {
        let count = self
            .bindings
            .field(self.key_field)
            .map(|f| f.values().len())
            .unwrap_or(0);
        if count == 0 {
            return Err(DsgenError::NoGenerationTarget {
                key: self.key_field.to_string(),
                count,
            });
        }
        Ok(count)
    }

    /// File names in generation order, after the duplicate policy.
    pub fn file_names(&self, options: &GeneratorOptions) -> Result<Vec<String>, DsgenError> {
        let total = self.item_count()?;
        let mut seen = HashSet::new();
        Ok((0..total)
            .map(|index| self.file_name_for(index, options, &mut seen))
            .collect())
    }

    pub fn run(&self, options: &mut GeneratorOptions) -> Result<GenerationReport, DsgenError> {
        let total = self.item_count()?;
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("generate_batch", key_field = self.key_field, total).entered();

        let mut report = GenerationReport::default();
        let mut seen = HashSet::new();
        for index in 0..total {
            if options
                .cancel_flag
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
            {
                #[cfg(feature = "tracing")]
                tracing::info!(completed = index, "generation cancelled");
                return Err(DsgenError::Cancelled { completed: index });
            }

            let file_name = self.file_name_for(index, options, &mut seen);
            let bytes = self
                .build_item(index, &mut report.skipped_sheets)
                .map_err(|source| DsgenError::ItemFailed {
                    index,
                    file_name: file_name.clone(),
                    source,
                })?;
            #[cfg(feature = "tracing")]
            tracing::debug!(index, file = %file_name, bytes = bytes.len(), "item built");

            if let Some(progress) = options.progress.as_mut() {
                progress(GenerationProgress {
                    index,
                    completed: index + 1,
                    total,
                    file_name: &file_name,
                });
            }
            report.files.push(GeneratedFile {
                index,
                file_name,
                bytes,
            });
        }
        Ok(report)
    }

    /// Run and hand the whole batch to `archiver` once every item succeeded.
    pub fn run_into<A: Archiver + ?Sized>(
        &self,
        options: &mut GeneratorOptions,
        archiver: &mut A,
    ) -> Result<BatchSummary, DsgenError> {
        let report = self.run(options)?;
        let summary = BatchSummary {
            file_names: report.file_names().map(str::to_string).collect(),
            skipped_sheets: report.skipped_sheets.clone(),
        };
        report.archive_into(archiver).map_err(DsgenError::Template)?;
        Ok(summary)
    }

    fn build_item(&self, index: usize, skipped: &mut BTreeSet<String>) -> Result<Vec<u8>, IoError> {
        let mut doc = self.template.fork()?;

        for (address, value) in self.bindings.globals() {
            write_cell(&mut doc, address, value, skipped)?;
        }
        for field in self.bindings.fields() {
            let value = field.value_for(index);
            for address in field.mappings() {
                write_cell(&mut doc, address, value, skipped)?;
            }
        }
        Ok(doc.to_bytes()?)
    }

    fn file_name_for(
        &self,
        index: usize,
        options: &GeneratorOptions,
        seen: &mut HashSet<String>,
    ) -> String {
        let value = self
            .bindings
            .field(self.key_field)
            .map(|f| f.value_for(index))
            .unwrap_or("");
        let name = self.naming.file_name(index, value, &options.extension);
        match options.duplicate_names {
            DuplicateNamePolicy::Overwrite => name,
            DuplicateNamePolicy::Suffix => disambiguate(name, &options.extension, seen),
        }
    }
}

fn write_cell<D>(
    doc: &mut D,
    address: &CellAddress,
    value: &str,
    skipped: &mut BTreeSet<String>,
) -> Result<(), IoError>
where
    D: OutputDocument,
    IoError: From<D::Error>,
{
    if !doc.has_sheet(address.sheet()) {
        if skipped.insert(address.sheet().to_string()) {
            #[cfg(feature = "tracing")]
            tracing::warn!(sheet = address.sheet(), "binding targets a sheet missing from the template");
        }
        return Ok(());
    }
    doc.set_text(address.sheet(), address.coord(), value)?;
    Ok(())
}

fn disambiguate(name: String, extension: &str, seen: &mut HashSet<String>) -> String {
    if seen.insert(name.clone()) {
        return name;
    }
    let stem = name.strip_suffix(extension).unwrap_or(&name);
    let mut n = 2;
    loop {
        let candidate = format!("{stem} ({n}){extension}");
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsgen_workbook::{JsonDocument, JsonTemplate, MemoryArchive};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn addr(cell: &str) -> CellAddress {
        CellAddress::new("Sheet1", cell).unwrap()
    }

    fn template() -> JsonTemplate {
        let mut t = JsonTemplate::new().with_sheet("Sheet1", Some("A1:C3"));
        t.set_cell("Sheet1", "A1", "Tag").unwrap();
        t.set_cell("Sheet1", "B1", "placeholder").unwrap();
        t
    }

    fn store_with_values(values: &[&str]) -> BindingStore {
        let mut store = BindingStore::new();
        store.bind_variable("ItemNo", addr("B1")).unwrap();
        for v in values {
            store.ensure_field("ItemNo").values.push(v.to_string());
        }
        store
    }

    fn cell(file: &GeneratedFile, cell: &str) -> Option<String> {
        JsonDocument::open_bytes(&file.bytes)
            .unwrap()
            .cell("Sheet1", cell)
            .map(str::to_string)
    }

    #[test]
    fn empty_key_value_gets_placeholder_name() {
        let t = template();
        let store = store_with_values(&["P-1", "", "P-3"]);
        let naming = FileNamingRule::default();
        let report = BatchGenerator::new(&t, &store, &naming, "ItemNo")
            .run(&mut GeneratorOptions::default())
            .unwrap();
        let names: Vec<_> = report.file_names().collect();
        assert_eq!(
            names,
            vec![
                "PROJECT_P-1_Datasheet.xlsx",
                "PROJECT_DS_002_Datasheet.xlsx",
                "PROJECT_P-3_Datasheet.xlsx",
            ]
        );
        assert_eq!(cell(&report.files[1], "B1").as_deref(), Some(""));
        assert_eq!(cell(&report.files[2], "B1").as_deref(), Some("P-3"));
    }

    #[test]
    fn variable_value_wins_over_global() {
        let t = template();
        let mut store = store_with_values(&["V0", "V1"]);
        store.bind_global(addr("B1"), "G");
        store.bind_global(addr("C3"), "shared");
        let naming = FileNamingRule::default();
        let report = BatchGenerator::new(&t, &store, &naming, "ItemNo")
            .run(&mut GeneratorOptions::default())
            .unwrap();
        assert_eq!(cell(&report.files[1], "B1").as_deref(), Some("V1"));
        assert_eq!(cell(&report.files[0], "C3").as_deref(), Some("shared"));
        assert_eq!(cell(&report.files[0], "A1").as_deref(), Some("Tag"));
    }

    #[test]
    fn short_value_lists_write_empty_strings() {
        let t = template();
        let mut store = store_with_values(&["a", "b"]);
        store.bind_variable("Rev", addr("C1")).unwrap();
        store.ensure_field("Rev").values.push("r0".into());
        let naming = FileNamingRule::default();
        let report = BatchGenerator::new(&t, &store, &naming, "ItemNo")
            .run(&mut GeneratorOptions::default())
            .unwrap();
        assert_eq!(cell(&report.files[0], "C1").as_deref(), Some("r0"));
        assert_eq!(cell(&report.files[1], "C1").as_deref(), Some(""));
    }

    #[test]
    fn outputs_do_not_leak_into_template() {
        let t = template();
        let store = store_with_values(&["x", "y"]);
        let naming = FileNamingRule::default();
        BatchGenerator::new(&t, &store, &naming, "ItemNo")
            .run(&mut GeneratorOptions::default())
            .unwrap();
        let doc = t.fork().unwrap();
        assert_eq!(doc.cell("Sheet1", "B1"), Some("placeholder"));
    }

    #[test]
    fn missing_key_field_is_rejected_up_front() {
        let t = template();
        let mut store = BindingStore::new();
        store.bind_variable("ItemNo", addr("B1")).unwrap();
        let naming = FileNamingRule::default();
        let err = BatchGenerator::new(&t, &store, &naming, "ItemNo")
            .run(&mut GeneratorOptions::default())
            .unwrap_err();
        assert!(matches!(err, DsgenError::NoGenerationTarget { count: 0, .. }));
        let err = BatchGenerator::new(&t, &store, &naming, "Nope")
            .item_count()
            .unwrap_err();
        assert!(matches!(err, DsgenError::NoGenerationTarget { key, .. } if key == "Nope"));
    }

    #[test]
    fn missing_sheet_is_skipped() {
        let t = template();
        let mut store = store_with_values(&["x"]);
        store.bind_global(CellAddress::new("Gone", "A1").unwrap(), "g");
        let naming = FileNamingRule::default();
        let report = BatchGenerator::new(&t, &store, &naming, "ItemNo")
            .run(&mut GeneratorOptions::default())
            .unwrap();
        assert_eq!(report.len(), 1);
        assert!(report.skipped_sheets.contains("Gone"));
    }

    #[test]
    fn progress_reports_in_index_order() {
        let t = template();
        let store = store_with_values(&["a", "b", "c"]);
        let naming = FileNamingRule::new("", "");
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let mut options = GeneratorOptions::default().with_extension(".json");
        options.progress = Some(Box::new(move |p: GenerationProgress<'_>| {
            sink.borrow_mut().push((p.completed, p.total, p.file_name.to_string()));
        }));
        BatchGenerator::new(&t, &store, &naming, "ItemNo")
            .run(&mut options)
            .unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                (1, 3, "a.json".to_string()),
                (2, 3, "b.json".to_string()),
                (3, 3, "c.json".to_string()),
            ]
        );
    }

    #[test]
    fn cancelled_batch_archives_nothing() {
        let t = template();
        let store = store_with_values(&["a", "b"]);
        let naming = FileNamingRule::default();
        let flag = Arc::new(AtomicBool::new(false));
        let trip = Arc::clone(&flag);
        let mut options = GeneratorOptions::default();
        options.cancel_flag = Some(flag);
        options.progress = Some(Box::new(move |_: GenerationProgress<'_>| trip.store(true, Ordering::Relaxed)));
        let mut archive = MemoryArchive::new();
        let err = BatchGenerator::new(&t, &store, &naming, "ItemNo")
            .run_into(&mut options, &mut archive)
            .unwrap_err();
        assert!(matches!(err, DsgenError::Cancelled { completed: 1 }));
        assert!(archive.is_empty());
    }

    #[test]
    fn duplicate_names_follow_policy() {
        let t = template();
        let store = store_with_values(&["same", "same", "same"]);
        let naming = FileNamingRule::new("", "");
        let generator = BatchGenerator::new(&t, &store, &naming, "ItemNo");

        let mut archive = MemoryArchive::new();
        generator
            .run_into(&mut GeneratorOptions::default(), &mut archive)
            .unwrap();
        assert_eq!(archive.names(), vec!["same.xlsx"]);

        let mut options = GeneratorOptions {
            duplicate_names: DuplicateNamePolicy::Suffix,
            ..Default::default()
        };
        assert_eq!(
            generator.file_names(&options).unwrap(),
            vec!["same.xlsx", "same (2).xlsx", "same (3).xlsx"]
        );
        let mut archive = MemoryArchive::new();
        generator.run_into(&mut options, &mut archive).unwrap();
        assert_eq!(archive.len(), 3);
    }

    /// Delegates to JSON but refuses to fork after `limit` items.
    struct FlakyTemplate {
        inner: JsonTemplate,
        forks: std::cell::Cell<usize>,
        limit: usize,
    }

    impl TemplateReader for FlakyTemplate {
        type Error = IoError;
        type Document = JsonDocument;

        fn backend_name(&self) -> &'static str {
            "flaky"
        }

        fn sheet_names(&self) -> Vec<String> {
            self.inner.sheet_names()
        }

        fn used_range(&self, sheet: &str) -> Result<Option<String>, IoError> {
            self.inner.used_range(sheet)
        }

        fn merged_regions(&self, sheet: &str) -> Result<Vec<dsgen_common::RegionRef>, IoError> {
            self.inner.merged_regions(sheet)
        }

        fn cell_text(
            &self,
            sheet: &str,
            coord: dsgen_common::CellRef,
        ) -> Result<Option<String>, IoError> {
            self.inner.cell_text(sheet, coord)
        }

        fn fork(&self) -> Result<JsonDocument, IoError> {
            let n = self.forks.get();
            self.forks.set(n + 1);
            if n >= self.limit {
                return Err(IoError::from_backend("flaky", "fork refused"));
            }
            self.inner.fork()
        }
    }

    #[test]
    fn failing_item_aborts_with_its_index() {
        let t = FlakyTemplate {
            inner: template(),
            forks: std::cell::Cell::new(0),
            limit: 2,
        };
        let store = store_with_values(&["a", "b", "c", "d"]);
        let naming = FileNamingRule::new("", "");
        let mut archive = MemoryArchive::new();
        let err = BatchGenerator::new(&t, &store, &naming, "ItemNo")
            .run_into(&mut GeneratorOptions::default(), &mut archive)
            .unwrap_err();
        match err {
            DsgenError::ItemFailed {
                index, file_name, ..
            } => {
                assert_eq!(index, 2);
                assert_eq!(file_name, "c.xlsx");
            }
            other => panic!("expected ItemFailed, got {other:?}"),
        }
        assert!(archive.is_empty());
    }
}
