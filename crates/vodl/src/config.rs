use std::{collections::HashMap, path::Path, time::Duration};

use serde::Deserialize;

use crate::{download::DownloadOptions, error::VodlResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VodlConfig {
    pub http: HttpConfig,
    pub download: DownloadOptions,
    pub cache: CacheConfig,
}

impl VodlConfig {
    pub fn from_toml_str(data: &str) -> VodlResult<Self> {
        Ok(toml::from_str(data)?)
    }

    pub fn load(path: impl AsRef<Path>) -> VodlResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_toml_str(&data)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout of every single request, in seconds
    pub timeout_secs: u64,
    /// Proxy for all schemes, e.g. `http://127.0.0.1:1080`
    pub proxy: Option<String>,
    /// Defaults to a recent Chrome user agent
    pub user_agent: Option<String>,
    pub headers: HashMap<String, String>,
    /// `Set-Cookie` style cookies, scoped to `cookie_url`
    pub cookies: Vec<String>,
    pub cookie_url: Option<String>,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            proxy: None,
            user_agent: None,
            headers: HashMap::new(),
            cookies: Vec::new(),
            cookie_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// File backing the metadata cache. Kept in memory when unset.
    pub path: Option<std::path::PathBuf>,
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            ttl_secs: 3600,
        }
    }
}
