//! Exclusive advisory lock over a vault directory.
//!
//! Key generation and section write-back both hold this lock, so two
//! processes bootstrapping the same vault agree on one key and never
//! lose each other's sections.  The lock belongs to the open lock file
//! and is released when the guard drops it.

use std::fs::{File, OpenOptions};
use std::path::Path;

use fs4::fs_std::FileExt;

use crate::errors::{Result, SupassError};

/// Name of the lock file inside the vault directory.
pub const LOCK_FILE_NAME: &str = ".lock";

/// Held while the vault directory is locked.
#[derive(Debug)]
pub struct DirLock {
    _file: File,
}

impl DirLock {
    /// Block until the exclusive lock on `dir` is acquired.
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE_NAME);

        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options
            .open(&path)
            .map_err(|e| SupassError::storage(&path, format!("cannot open lock file: {e}")))?;

        FileExt::lock_exclusive(&file)
            .map_err(|e| SupassError::storage(&path, format!("cannot lock: {e}")))?;

        tracing::debug!(path = %path.display(), "vault lock acquired");
        Ok(Self { _file: file })
    }
}
