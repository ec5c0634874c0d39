//! Manifest builder: collects one entry per acquired book and writes them as a pretty JSON array.
//!
//! The whole manifest is written once, replacing any previous file. Non-ASCII text is kept as-is.

use crate::model::ManifestEntry;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to write manifest: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize manifest: {0}")]
    Json(#[from] serde_json::Error),
}

/// In-memory manifest in insertion order. No two entries share a `book_path`.
#[derive(Debug, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    book_paths: HashSet<PathBuf>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry`. Returns false (and drops it) if an entry with the same `book_path` exists.
    pub fn record(&mut self, entry: ManifestEntry) -> bool {
        if !self.book_paths.insert(entry.book_path.clone()) {
            tracing::warn!(
                book_path = %entry.book_path.display(),
                "duplicate manifest entry ignored"
            );
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write all entries to `path`, truncating it. Creates the parent directory if needed.
    pub fn persist(&self, path: &Path) -> Result<(), ManifestError> {
        let io_err = |source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.entries)?;
        writer.write_all(b"\n").map_err(io_err)?;
        writer.flush().map_err(io_err)?;
        Ok(())
    }

    /// Read a manifest file written by [`Manifest::persist`].
    pub fn load(path: &Path) -> Result<Vec<ManifestEntry>, ManifestError> {
        let file = File::open(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn entry(id: u64, title: &str) -> ManifestEntry {
        ManifestEntry {
            title: title.to_string(),
            author: "Автор".to_string(),
            img_src: Some(PathBuf::from(format!("out/Images/{}.jpg", id))),
            book_path: PathBuf::from(format!("out/Books/{}. {}", id, title)),
            comments: vec!["Хорошо".to_string()],
            genres: vec!["Фантастика".to_string()],
        }
    }

    #[test]
    fn record_rejects_duplicate_book_path() {
        let mut manifest = Manifest::new();
        assert!(manifest.record(entry(1, "Один")));
        assert!(!manifest.record(entry(1, "Один")));
        assert!(manifest.record(entry(2, "Два")));
        assert_eq!(manifest.len(), 2);
    }

    #[test]
    fn persist_round_trips_in_insertion_order() -> Result<(), Box<dyn Error>> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("nested").join("info.json");
        let mut manifest = Manifest::new();
        manifest.record(entry(3, "Третья"));
        manifest.record(entry(1, "Первая"));
        manifest.persist(&path)?;

        let loaded = Manifest::load(&path)?;
        assert_eq!(loaded, vec![entry(3, "Третья"), entry(1, "Первая")]);

        let raw = std::fs::read_to_string(&path)?;
        assert!(raw.contains("Третья"), "non-ASCII must not be escaped");
        assert!(!raw.contains("\\u"));
        assert!(raw.starts_with("[\n"));
        Ok(())
    }

    #[test]
    fn persist_truncates_previous_file() -> Result<(), Box<dyn Error>> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("info.json");
        std::fs::write(&path, "[{\"stale\": true}, {\"stale\": true}, {\"stale\": true}]")?;

        let mut manifest = Manifest::new();
        manifest.record(entry(1, "A"));
        manifest.persist(&path)?;
        let first = std::fs::read(&path)?;
        manifest.persist(&path)?;
        let second = std::fs::read(&path)?;

        assert_eq!(first, second);
        assert_eq!(Manifest::load(&path)?.len(), 1);
        Ok(())
    }

    #[test]
    fn empty_manifest_is_empty_array() -> Result<(), Box<dyn Error>> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("info.json");
        let manifest = Manifest::new();
        assert!(manifest.is_empty());
        manifest.persist(&path)?;
        assert_eq!(std::fs::read_to_string(&path)?.trim(), "[]");
        Ok(())
    }
}
