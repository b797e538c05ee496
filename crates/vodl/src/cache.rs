pub mod file;
pub mod memory;

use std::{future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{config::CacheConfig, error::VodlResult};

/// A key-value store for catalog metadata with explicit expiry.
pub trait MetadataCache: Send + Sync {
    /// Get a value which has not expired yet.
    fn get(&self, key: &str) -> impl Future<Output = VodlResult<Option<Value>>> + Send;

    /// Store a value for `ttl`.
    fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Duration,
    ) -> impl Future<Output = VodlResult<()>> + Send;

    fn invalidate(&self, key: &str) -> impl Future<Output = VodlResult<()>> + Send;

    fn clear(&self) -> impl Future<Output = VodlResult<()>> + Send;
}

/// Typed access on top of the JSON values of a [MetadataCache].
pub trait MetadataCacheExt: MetadataCache {
    fn get_as<T>(&self, key: &str) -> impl Future<Output = VodlResult<Option<T>>> + Send
    where
        T: DeserializeOwned,
    {
        async move {
            match self.get(key).await? {
                Some(value) => Ok(Some(serde_json::from_value(value)?)),
                None => Ok(None),
            }
        }
    }

    fn set_as<T>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> impl Future<Output = VodlResult<()>> + Send
    where
        T: Serialize + Sync,
    {
        async move { self.set(key, serde_json::to_value(value)?, ttl).await }
    }
}

impl<C> MetadataCacheExt for C where C: MetadataCache + ?Sized {}

impl<C> MetadataCache for Arc<C>
where
    C: MetadataCache,
{
    fn get(&self, key: &str) -> impl Future<Output = VodlResult<Option<Value>>> + Send {
        self.as_ref().get(key)
    }

    fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Duration,
    ) -> impl Future<Output = VodlResult<()>> + Send {
        self.as_ref().set(key, value, ttl)
    }

    fn invalidate(&self, key: &str) -> impl Future<Output = VodlResult<()>> + Send {
        self.as_ref().invalidate(key)
    }

    fn clear(&self) -> impl Future<Output = VodlResult<()>> + Send {
        self.as_ref().clear()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CacheEntry {
    pub value: Value,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(value: Value, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { value, expires_at }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub enum VodlCache {
    Memory(memory::MemoryMetadataCache),
    File(file::FileMetadataCache),
}

impl VodlCache {
    pub fn memory() -> Self {
        Self::Memory(memory::MemoryMetadataCache::new())
    }

    pub fn file(path: impl Into<std::path::PathBuf>) -> Self {
        Self::File(file::FileMetadataCache::new(path))
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        match &config.path {
            Some(path) => Self::file(path),
            None => Self::memory(),
        }
    }
}

impl MetadataCache for VodlCache {
    async fn get(&self, key: &str) -> VodlResult<Option<Value>> {
        match self {
            VodlCache::Memory(cache) => cache.get(key).await,
            VodlCache::File(cache) => cache.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> VodlResult<()> {
        match self {
            VodlCache::Memory(cache) => cache.set(key, value, ttl).await,
            VodlCache::File(cache) => cache.set(key, value, ttl).await,
        }
    }

    async fn invalidate(&self, key: &str) -> VodlResult<()> {
        match self {
            VodlCache::Memory(cache) => cache.invalidate(key).await,
            VodlCache::File(cache) => cache.invalidate(key).await,
        }
    }

    async fn clear(&self) -> VodlResult<()> {
        match self {
            VodlCache::Memory(cache) => cache.clear().await,
            VodlCache::File(cache) => cache.clear().await,
        }
    }
}
