use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::hls::BitrateCriterion;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadOptions {
    /// Total attempts of every network fetch, including the first one
    pub attempts: u32,
    /// Granularity of partial progress reports, in bytes
    pub chunk_size: usize,
    pub retry_delay_ms: u64,
    /// Replace an existing output file instead of failing
    pub overwrite: bool,
    /// Where staged segments are kept. Defaults to the directory of the output file.
    pub staging_dir: Option<PathBuf>,
    /// Hold an advisory lock on `<output>.lock` while downloading
    pub lock_output: bool,
    /// Variant picked when an episode resolves to a master playlist
    pub selection: BitrateCriterion,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            attempts: 3,
            chunk_size: 64 * 1024,
            retry_delay_ms: 1000,
            overwrite: false,
            staging_dir: None,
            lock_output: true,
            selection: BitrateCriterion::Max,
        }
    }
}

impl DownloadOptions {
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_staging_dir(mut self, staging_dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(staging_dir.into());
        self
    }

    pub fn with_lock_output(mut self, lock_output: bool) -> Self {
        self.lock_output = lock_output;
        self
    }

    pub fn with_selection(mut self, selection: BitrateCriterion) -> Self {
        self.selection = selection;
        self
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// At least one attempt is always made.
    pub(crate) fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    pub(crate) fn chunk_len(&self) -> usize {
        self.chunk_size.max(1)
    }
}
