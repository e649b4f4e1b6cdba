//! Advisory lock files
//!
//! A lock is a marker file created with `O_CREAT | O_EXCL` semantics, so two
//! processes can never both believe they created it. The marker holds the pid of
//! its owner for diagnostics and is removed when the guard is dropped.

use crate::storage::traits::{StorageError, StorageResult};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Held exclusive lock; released on drop
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    released: bool,
}

impl FileLock {
    /// Attempts to create the marker once
    ///
    /// # Returns
    ///
    /// * `Ok(Some(FileLock))` - The marker was created by this call
    /// * `Ok(None)` - The marker already exists
    /// * `Err(StorageError)` - Any other filesystem failure
    pub fn try_acquire(path: &Path) -> StorageResult<Option<Self>> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                let lock = Self {
                    path: path.to_path_buf(),
                    released: false,
                };
                // The pid is informational only.
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Some(lock))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Polls for the marker until it is created or `timeout` elapses
    ///
    /// On timeout returns `StorageError::LockUnavailable`; a marker owned by
    /// someone else is never touched.
    pub fn acquire(path: &Path, timeout: Duration, poll: Duration) -> StorageResult<Self> {
        let started = Instant::now();

        loop {
            if let Some(lock) = Self::try_acquire(path)? {
                tracing::trace!("Acquired lock {}", path.display());
                return Ok(lock);
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(StorageError::LockUnavailable {
                    path: path.to_path_buf(),
                    waited,
                });
            }

            std::thread::sleep(poll.min(timeout - waited));
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the marker, reporting failures instead of swallowing them
    pub fn release(mut self) -> StorageResult<()> {
        self.released = true;
        std::fs::remove_file(&self.path)?;
        Ok(())
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!("Failed to remove lock {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Lock marker path for a target file: `<target>.lock`
pub fn lock_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path() {
        assert_eq!(
            lock_path(Path::new("/tmp/cache/doulist_1.json")),
            PathBuf::from("/tmp/cache/doulist_1.json.lock")
        );
    }

    #[test]
    fn test_try_acquire_is_exclusive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.lock");

        let first = FileLock::try_acquire(&path).unwrap();
        assert!(first.is_some());
        assert!(FileLock::try_acquire(&path).unwrap().is_none());

        drop(first);
        assert!(!path.exists());
        assert!(FileLock::try_acquire(&path).unwrap().is_some());
    }

    #[test]
    fn test_acquire_times_out_and_leaves_foreign_marker() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("b.lock");
        std::fs::write(&path, "someone else").unwrap();

        let result = FileLock::acquire(&path, Duration::from_millis(50), Duration::from_millis(10));
        assert!(matches!(result, Err(StorageError::LockUnavailable { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "someone else");
    }

    #[test]
    fn test_acquire_waits_for_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.lock");
        let held = FileLock::try_acquire(&path).unwrap().unwrap();

        let releaser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            held.release().unwrap();
        });

        let lock = FileLock::acquire(&path, Duration::from_secs(5), Duration::from_millis(5)).unwrap();
        assert_eq!(lock.path(), path.as_path());
        releaser.join().unwrap();
    }
}
