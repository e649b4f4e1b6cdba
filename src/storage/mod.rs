//! Storage module for persisting harvest progress
//!
//! This module handles all durable state of the harvester:
//! - Crash-safe atomic file replacement with timestamped backups
//! - Optional advisory lock files around a write
//! - Per-source record caches that double as crawl checkpoints

pub mod atomic;
mod cache;
mod lock;
mod traits;

pub use atomic::{write_atomic, LockOptions, WriteOptions};
pub use cache::JsonCacheStore;
pub use lock::{lock_path, FileLock};
pub use traits::{CacheStore, StorageError, StorageResult};

use crate::config::{CacheConfig, OutputConfig};

/// Builds the cache store described by the configuration
///
/// Cache saves always keep backups; the lock is only taken when
/// `[cache] lock = true`.
pub fn open_cache_store(output: &OutputConfig, cache: &CacheConfig) -> JsonCacheStore {
    let lock = cache.lock.then(|| LockOptions {
        timeout: cache.lock_timeout(),
        poll: cache.lock_poll(),
    });

    JsonCacheStore::with_options(
        &output.cache_root,
        WriteOptions {
            backup: true,
            keep_backups: cache.keep_backups,
            lock,
        },
    )
}
