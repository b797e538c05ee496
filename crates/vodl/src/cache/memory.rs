use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::Utc;
use serde_json::Value;

use super::{CacheEntry, MetadataCache};
use crate::error::VodlResult;

/// Metadata cache living as long as the process.
#[derive(Default)]
pub struct MemoryMetadataCache {
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryMetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl MetadataCache for MemoryMetadataCache {
    async fn get(&self, key: &str) -> VodlResult<Option<Value>> {
        let mut cache = self.lock();
        let expired = match cache.get(key) {
            Some(entry) if !entry.is_expired(Utc::now()) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            cache.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> VodlResult<()> {
        let now = Utc::now();
        let mut cache = self.lock();
        cache.retain(|_, entry| !entry.is_expired(now));
        cache.insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> VodlResult<()> {
        self.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> VodlResult<()> {
        self.lock().clear();
        Ok(())
    }
}
