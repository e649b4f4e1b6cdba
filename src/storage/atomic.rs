//! Crash-safe file replacement
//!
//! Every durable artifact (caches, output chunks, manifests) goes through
//! [`write_atomic`]: the new content is written to a temp file in the target's
//! directory, synced, and renamed over the target. The target path only ever
//! holds the complete old content or the complete new content.

use crate::storage::lock::{lock_path, FileLock};
use crate::storage::traits::{StorageError, StorageResult};
use chrono::Utc;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lock acquisition parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    pub timeout: Duration,
    pub poll: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll: Duration::from_millis(100),
        }
    }
}

/// How a single atomic write behaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Keep a timestamped copy of the previous content before replacing it
    pub backup: bool,

    /// Backups retained per target; 0 keeps all of them
    pub keep_backups: usize,

    /// Guard the write with `<target>.lock`
    pub lock: Option<LockOptions>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            backup: true,
            keep_backups: 5,
            lock: None,
        }
    }
}

impl WriteOptions {
    /// Options for regenerable output artifacts: backup on, lock off
    pub fn for_output(keep_backups: usize) -> Self {
        Self {
            backup: true,
            keep_backups,
            lock: None,
        }
    }
}

/// Atomically replaces `path` with `bytes`
pub fn write_atomic(path: &Path, bytes: &[u8], options: &WriteOptions) -> StorageResult<()> {
    write_atomic_with(path, options, |file| file.write_all(bytes))
}

/// Atomically replaces `path` with whatever `write` produces
///
/// # Steps
///
/// 1. Create the parent directory
/// 2. Acquire the lock marker, if configured (fails with `LockUnavailable`)
/// 3. Run `write` against a fresh temp file next to the target, then fsync it
/// 4. Back up the current target (best-effort, never blocks the replace)
/// 5. Rename the temp file over the target
///
/// The temp file is deleted on every failure path, and the lock marker is
/// released whether or not the write succeeded.
pub fn write_atomic_with<F>(path: &Path, options: &WriteOptions, write: F) -> StorageResult<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let parent = parent_dir(path);
    fs::create_dir_all(&parent)?;

    let _lock = match options.lock {
        Some(lock) => Some(FileLock::acquire(&lock_path(path), lock.timeout, lock.poll)?),
        None => None,
    };

    let mut temp = tempfile::Builder::new()
        .prefix(&temp_prefix(path))
        .suffix(".tmp")
        .tempfile_in(&parent)?;

    write(temp.as_file_mut())?;
    temp.as_file_mut().flush()?;
    temp.as_file().sync_all()?;

    if options.backup && path.exists() {
        match backup_existing(path, &backup_path(path)) {
            Ok(backup) => {
                tracing::debug!("Backed up {} to {}", path.display(), backup.display());
                prune_backups(path, options.keep_backups);
            }
            Err(e) => {
                tracing::warn!("Backup of {} failed, replacing anyway: {}", path.display(), e);
            }
        }
    }

    temp.persist(path)
        .map_err(|e| StorageError::Io(e.error))?;

    Ok(())
}

/// Directory holding `path`; `.` for bare file names
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn file_name(path: &Path) -> OsString {
    path.file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("output"))
}

fn temp_prefix(path: &Path) -> String {
    format!(".{}.", file_name(path).to_string_lossy())
}

/// Timestamped backup path: `<target>.<YYYYMMDDTHHMMSS.mmm>Z.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let mut name = file_name(path);
    name.push(format!(".{}.bak", stamp));
    parent_dir(path).join(name)
}

/// Keeps the current content reachable under `backup`
///
/// A hard link is tried first so the target is never absent; filesystems
/// without hard links fall back to a copy. An existing backup of the same name
/// is never written to, since it may share its inode with older content.
fn backup_existing(path: &Path, backup: &Path) -> io::Result<PathBuf> {
    match fs::hard_link(path, backup) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Err(e),
        Err(_) => {
            fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(backup)?;
            fs::copy(path, backup)?;
        }
    }
    Ok(backup.to_path_buf())
}

/// Lists existing backups of `path`, oldest first
pub fn list_backups(path: &Path) -> Vec<PathBuf> {
    let prefix = format!("{}.", file_name(path).to_string_lossy());
    let Ok(entries) = fs::read_dir(parent_dir(path)) else {
        return Vec::new();
    };

    let mut backups: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy())
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".bak"))
        })
        .collect();

    // Timestamps are fixed-width, so lexical order is chronological.
    backups.sort();
    backups
}

fn prune_backups(path: &Path, keep: usize) {
    if keep == 0 {
        return;
    }

    let backups = list_backups(path);
    let excess = backups.len().saturating_sub(keep);
    for old in backups.into_iter().take(excess) {
        if let Err(e) = fs::remove_file(&old) {
            tracing::debug!("Could not prune backup {}: {}", old.display(), e);
        }
    }
}
