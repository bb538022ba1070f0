//! Key-value blob storage for the workspace state and the profile table.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const STATE_KEY: &str = "dsgen_state_v1";
pub const PROFILES_KEY: &str = "dsgen_profiles_v1";
/// Copy of a state blob that could not be parsed, kept before starting fresh.
pub const STATE_BACKUP_KEY: &str = "dsgen_state_v1_unreadable";

/// Minimal string store, in the shape of browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> std::io::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> std::io::Result<()>;
    fn remove(&mut self, key: &str) -> std::io::Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> std::io::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> std::io::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> std::io::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory.
///
/// [`STATE_KEY`] maps to `state.json`, [`STATE_BACKUP_KEY`] to
/// `state.unreadable.json` and [`PROFILES_KEY`] to `profiles.json`; any other
/// key is stored as `<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let file = match key {
            STATE_KEY => "state.json".to_string(),
            STATE_BACKUP_KEY => "state.unreadable.json".to_string(),
            PROFILES_KEY => "profiles.json".to_string(),
            other => format!("{other}.json"),
        };
        self.root.join(file)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> std::io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(key);
        // write-then-rename
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)
    }

    fn remove(&mut self, key: &str) -> std::io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_maps_known_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("nested"));
        assert_eq!(store.get(STATE_KEY).unwrap(), None);
        store.set(STATE_KEY, "{}").unwrap();
        store.set(PROFILES_KEY, "{\"a\":1}").unwrap();
        store.set(STATE_BACKUP_KEY, "{").unwrap();
        assert!(dir.path().join("nested/state.json").exists());
        assert!(dir.path().join("nested/state.unreadable.json").exists());
        assert_eq!(store.get(PROFILES_KEY).unwrap().as_deref(), Some("{\"a\":1}"));
        store.remove(STATE_KEY).unwrap();
        store.remove(STATE_KEY).unwrap();
        assert_eq!(store.get(STATE_KEY).unwrap(), None);
    }

    #[test]
    fn memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
