use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::Utc;
use fs2::FileExt;
use serde_json::Value;

use super::{CacheEntry, MetadataCache};
use crate::{error::VodlResult, util::path::VodlPathExt};

type Entries = HashMap<String, CacheEntry>;

/// Metadata cache stored as a JSON document, shared between processes.
///
/// Readers hold a shared lock on `<path>.lock` and writers an exclusive one.
pub struct FileMetadataCache {
    path: PathBuf,
}

impl FileMetadataCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` on the cache file with the lock held, off the async runtime.
    async fn locked<T, F>(&self, exclusive: bool, f: F) -> VodlResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> VodlResult<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }

            let lock = open_lock_file(&path)?;
            if exclusive {
                FileExt::lock_exclusive(&lock)?;
            } else {
                FileExt::lock_shared(&lock)?;
            }
            let result = f(&path);
            if let Err(e) = FileExt::unlock(&lock) {
                tracing::warn!("Failed to unlock {}: {e}", path.display());
            }
            result
        })
        .await
        .map_err(std::io::Error::other)?
    }
}

fn open_lock_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path.lock_path())
}

fn read_entries(path: &Path) -> VodlResult<Entries> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_slice(&data) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            tracing::warn!("Discarding corrupted cache {}: {e}", path.display());
            Ok(Entries::new())
        }
    }
}

fn write_entries(path: &Path, entries: &Entries) -> VodlResult<()> {
    let part = path.part_path();
    std::fs::write(&part, serde_json::to_vec(entries)?)?;
    std::fs::rename(&part, path)?;
    Ok(())
}

impl MetadataCache for FileMetadataCache {
    async fn get(&self, key: &str) -> VodlResult<Option<Value>> {
        let key = key.to_string();
        self.locked(false, move |path| {
            let mut entries = read_entries(path)?;
            Ok(entries
                .remove(&key)
                .filter(|entry| !entry.is_expired(Utc::now()))
                .map(|entry| entry.value))
        })
        .await
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> VodlResult<()> {
        let key = key.to_string();
        self.locked(true, move |path| {
            let now = Utc::now();
            let mut entries = read_entries(path)?;
            entries.retain(|_, entry| !entry.is_expired(now));
            entries.insert(key, CacheEntry::new(value, ttl));
            write_entries(path, &entries)
        })
        .await
    }

    async fn invalidate(&self, key: &str) -> VodlResult<()> {
        let key = key.to_string();
        self.locked(true, move |path| {
            let mut entries = read_entries(path)?;
            if entries.remove(&key).is_some() {
                write_entries(path, &entries)?;
            }
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> VodlResult<()> {
        self.locked(true, |path| {
            match std::fs::remove_file(path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
            Ok(())
        })
        .await
    }
}
