//! Advisory locks that serialize appends to one sheet.
//!
//! Each table `<name>.jsonl` gets a sibling `<name>.lock`. Writers hold an
//! exclusive `flock` on it for the duration of an append; readers never lock.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Error, Result};

/// How long an append waits for a busy sheet before giving up
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Exclusive hold on a sheet's lock file; unlocked on drop.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Wait up to `timeout_ms` for the lock at `path`, creating the file if needed.
    pub fn acquire(path: impl AsRef<Path>, timeout_ms: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        // No deadline means the timeout is too large to represent: wait forever.
        let deadline = Instant::now().checked_add(Duration::from_millis(timeout_ms));
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(err) if contended(&err) && deadline.map_or(true, |end| Instant::now() < end) => {
                    thread::sleep(POLL_INTERVAL);
                }
                Err(err) if contended(&err) => {
                    tracing::warn!(path = %path.display(), timeout_ms, "sheet is busy");
                    return Err(Error::LockFailed(path));
                }
                Err(err) => return Err(err.into()),
            }
        }

        tracing::debug!(path = %path.display(), "sheet locked");
        Ok(Self { file, path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::debug!(path = %self.path.display(), error = %err, "unlock failed");
        }
    }
}

// fs2 reports contention with a platform-specific code.
fn contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
