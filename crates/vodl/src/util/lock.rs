use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use fs2::FileExt;

use super::path::VodlPathExt;
use crate::error::{VodlError, VodlResult};

/// Exclusive advisory lock on `<target>.lock`, released on drop.
///
/// The lock file is never removed, so every process locks the same inode.
#[derive(Debug)]
pub struct OutputLock {
    file: File,
    path: PathBuf,
}

impl OutputLock {
    /// Fails with [VodlError::OutputLocked] if another process holds the lock.
    pub fn acquire(target: &Path) -> VodlResult<Self> {
        let path = target.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        if FileExt::try_lock_exclusive(&file).is_err() {
            return Err(VodlError::OutputLocked(target.to_path_buf()));
        }

        tracing::debug!("Acquired lock {}", path.display());
        Ok(Self { file, path })
    }
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to unlock {}: {e}", self.path.display());
        }
    }
}
