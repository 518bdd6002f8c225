//! Writer-exclusive process lock over `.pui/index.lock` (§5).
//!
//! Only one writer may index a repository at a time; readers (pack
//! generators) never take this lock. The lock file holds the holder's PID as
//! plain text so a dead holder can be detected and reclaimed without an OS
//! advisory-lock API that would vary by platform.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// An acquired writer lock. Dropping it removes the lock file, even on an
/// early return via `?` — this is the RAII guard the indexer holds for the
/// duration of a run.
pub struct WriterLock {
    path: PathBuf,
    released: bool,
}

impl WriterLock {
    /// Attempt to acquire the writer lock at `lock_path`. Fails immediately
    /// with [`StoreError::LockContention`] if another live process holds it.
    /// A stale lock (holder PID no longer running) is reclaimed silently.
    pub fn acquire(lock_path: &Path) -> Result<Self, StoreError> {
        if let Some(holder_pid) = read_holder(lock_path) {
            if process_is_alive(holder_pid) {
                return Err(StoreError::LockContention {
                    path: lock_path.to_path_buf(),
                    holder_pid,
                });
            }
            // Stale: previous holder is gone, reclaim by overwriting below.
        }

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::LockIo {
                path: lock_path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(lock_path)
            .map_err(|e| StoreError::LockIo { path: lock_path.to_path_buf(), reason: e.to_string() })?;

        write!(file, "{}", std::process::id())
            .map_err(|e| StoreError::LockIo { path: lock_path.to_path_buf(), reason: e.to_string() })?;

        Ok(Self { path: lock_path.to_path_buf(), released: false })
    }

    /// Release the lock early, returning any I/O error instead of swallowing
    /// it the way `Drop` must.
    pub fn release(mut self) -> std::io::Result<()> {
        self.released = true;
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn read_holder(lock_path: &Path) -> Option<u32> {
    let mut contents = String::new();
    File::open(lock_path).ok()?.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

#[cfg(unix)]
fn process_is_alive(pid: u32) -> bool {
    // Signal 0 performs existence/permission checks without delivering a
    // real signal (kill(2)).
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(not(unix))]
fn process_is_alive(_pid: u32) -> bool {
    // Conservative default off Unix: assume alive rather than reclaim a lock
    // that might still be held.
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_creates_lock_file_with_current_pid() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("index.lock");
        let lock = WriterLock::acquire(&lock_path).unwrap();
        assert_eq!(read_holder(&lock_path), Some(std::process::id()));
        drop(lock);
        assert!(!lock_path.exists());
    }

    #[test]
    fn acquire_fails_while_another_live_process_holds_it() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("index.lock");
        fs::write(&lock_path, "1").unwrap(); // pid 1 (init) is always alive on unix

        let result = WriterLock::acquire(&lock_path);
        assert!(result.is_err());
    }

    #[test]
    fn acquire_reclaims_a_stale_lock() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("index.lock");
        // A pid that is exceedingly unlikely to be alive.
        fs::write(&lock_path, "999999").unwrap();

        let lock = WriterLock::acquire(&lock_path);
        assert!(lock.is_ok());
    }

    #[test]
    fn release_removes_file_and_drop_is_a_no_op_after() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("index.lock");
        let lock = WriterLock::acquire(&lock_path).unwrap();
        lock.release().unwrap();
        assert!(!lock_path.exists());
    }
}
