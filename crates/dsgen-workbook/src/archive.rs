//! Bundling generated documents into one archive.
//!
//! Entries are keyed by file name. Adding a name that is already present
//! replaces the earlier bytes while keeping the first entry's position.

use crate::IoError;

/// Sink for `(file name, bytes)` pairs produced by a batch.
pub trait Archiver {
    fn add(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), IoError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered entry list with replace-on-duplicate semantics.
#[derive(Debug, Default, Clone)]
pub struct MemoryArchive {
    entries: Vec<(String, Vec<u8>)>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, bytes)| bytes.as_slice())
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn into_entries(self) -> Vec<(String, Vec<u8>)> {
        self.entries
    }
}

impl Archiver for MemoryArchive {
    fn add(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), IoError> {
        match self.entries.iter_mut().find(|(entry, _)| entry == name) {
            Some((_, existing)) => *existing = bytes,
            None => self.entries.push((name.to_string(), bytes)),
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Deflate-compressed zip built from a [`MemoryArchive`] at finish time.
#[cfg(feature = "zip")]
#[derive(Debug, Default)]
pub struct ZipArchiver {
    staged: MemoryArchive,
}

#[cfg(feature = "zip")]
impl ZipArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write all staged entries and return the archive bytes.
    pub fn finish(self) -> Result<Vec<u8>, IoError> {
        use std::io::{Cursor, Write};
        use zip::write::FileOptions;

        let mut zout = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, bytes) in self.staged.into_entries() {
            zout.start_file(name, options)?;
            zout.write_all(&bytes)?;
        }
        let cursor = zout.finish()?;
        Ok(cursor.into_inner())
    }

    /// Convenience for writing straight to disk.
    pub fn finish_to_path<P: AsRef<std::path::Path>>(self, path: P) -> Result<(), IoError> {
        let bytes = self.finish()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(feature = "zip")]
impl Archiver for ZipArchiver {
    fn add(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), IoError> {
        self.staged.add(name, bytes)
    }

    fn len(&self) -> usize {
        self.staged.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_replace_in_place() {
        let mut archive = MemoryArchive::new();
        archive.add("a.xlsx", vec![1]).unwrap();
        archive.add("b.xlsx", vec![2]).unwrap();
        archive.add("a.xlsx", vec![3]).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.names(), vec!["a.xlsx", "b.xlsx"]);
        assert_eq!(archive.get("a.xlsx"), Some(&[3u8][..]));
    }
}
