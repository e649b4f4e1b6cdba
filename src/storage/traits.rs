//! Storage traits and error types
//!
//! This module defines the trait interface for per-source cache stores and
//! associated error types.

use crate::record::Record;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt cache file {}: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    #[error("Lock unavailable for {} after {waited:?}", path.display())]
    LockUnavailable { path: PathBuf, waited: Duration },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for per-source record caches
///
/// A cache holds the full, ordered record sequence harvested for one source.
/// It doubles as the crawl checkpoint: it is rewritten in full after every page.
pub trait CacheStore: Send + Sync {
    /// Location of the cache file for a source
    fn path_for(&self, source_id: &str) -> PathBuf;

    /// Loads the cached records, reporting unreadable state as an error
    ///
    /// A missing cache file is not an error and yields an empty sequence.
    /// Malformed content yields `StorageError::Corrupt`.
    fn load_strict(&self, source_id: &str) -> StorageResult<Vec<Record>>;

    /// Persists the full record sequence for a source
    ///
    /// Implementations must never leave a partially written cache visible.
    /// The call is blocking; with locking enabled it may sleep while polling
    /// for the lock, up to the configured timeout.
    fn save(&self, source_id: &str, records: &[Record]) -> StorageResult<()>;

    /// Loads the cached records, treating any failure as "no prior state"
    ///
    /// This keeps a crawl resumable after a damaged cache file; the failure is
    /// logged but not surfaced.
    fn load(&self, source_id: &str) -> Vec<Record> {
        match self.load_strict(source_id) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable cache for source {} ({}): {}",
                    source_id,
                    self.path_for(source_id).display(),
                    e
                );
                Vec::new()
            }
        }
    }
}
