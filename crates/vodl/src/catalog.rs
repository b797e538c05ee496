use std::{future::Future, time::Duration};

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::{
    cache::{MetadataCache, MetadataCacheExt},
    error::VodlResult,
};

/// Where to download an episode from, as resolved by the catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeStream {
    /// Master or media playlist of the episode
    pub playlist_uri: String,
    /// Human readable name, used as the output file stem
    pub filename_stem: String,
}

/// Resolves opaque show/episode identifiers to playable streams.
pub trait CatalogClient: Send + Sync {
    fn resolve(&self, id: &str) -> impl Future<Output = VodlResult<EpisodeStream>> + Send;
}

/// Supplies the credentials required by playlist and segment requests.
pub trait SessionProvider {
    /// Extra request headers, such as authorization tokens.
    fn headers(&self) -> HeaderMap;

    /// Session cookies together with the URL they belong to.
    fn cookies(&self) -> (String, Vec<String>) {
        (String::new(), Vec::new())
    }
}

/// Memoizes resolved episodes in a [MetadataCache].
pub struct CachedCatalog<C, M> {
    inner: C,
    cache: M,
    ttl: Duration,
}

impl<C, M> CachedCatalog<C, M> {
    pub fn new(inner: C, cache: M, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    fn cache_key(id: &str) -> String {
        format!("episode:{id}")
    }
}

impl<C, M> CatalogClient for CachedCatalog<C, M>
where
    C: CatalogClient,
    M: MetadataCache,
{
    async fn resolve(&self, id: &str) -> VodlResult<EpisodeStream> {
        let key = Self::cache_key(id);
        match self.cache.get_as::<EpisodeStream>(&key).await {
            Ok(Some(stream)) => {
                tracing::debug!("Episode {id} resolved from cache.");
                return Ok(stream);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read cached episode {id}: {e}"),
        }

        let stream = self.inner.resolve(id).await?;
        if let Err(e) = self.cache.set_as(&key, &stream, self.ttl).await {
            tracing::warn!("Failed to cache episode {id}: {e}");
        }
        Ok(stream)
    }
}
