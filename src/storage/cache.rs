//! JSON file cache store
//!
//! One pretty-printed JSON array per source at `<root>/doulist_<id>.json`.

use crate::record::Record;
use crate::storage::atomic::{write_atomic, WriteOptions};
use crate::storage::traits::{CacheStore, StorageError, StorageResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Cache store backed by one JSON file per source
#[derive(Debug, Clone)]
pub struct JsonCacheStore {
    root: PathBuf,
    options: WriteOptions,
}

impl JsonCacheStore {
    /// Creates a store rooted at `root` with default write options (backup on, no lock)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_options(root, WriteOptions::default())
    }

    pub fn with_options(root: impl Into<PathBuf>, options: WriteOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }
}

impl CacheStore for JsonCacheStore {
    fn path_for(&self, source_id: &str) -> PathBuf {
        self.root.join(format!("doulist_{}.json", source_id))
    }

    fn load_strict(&self, source_id: &str) -> StorageResult<Vec<Record>> {
        let path = self.path_for(source_id);

        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        serde_json::from_slice(&content).map_err(|e| StorageError::Corrupt {
            path,
            message: e.to_string(),
        })
    }

    fn save(&self, source_id: &str, records: &[Record]) -> StorageResult<()> {
        let path = self.path_for(source_id);
        let json = serde_json::to_vec_pretty(records)?;
        write_atomic(&path, &json, &self.options)?;
        tracing::debug!("Saved {} records to {}", records.len(), path.display());
        Ok(())
    }
}
