pub mod cache;
pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod fetch;
pub mod hls;
pub mod stitch;
pub mod util;

pub use download::{DownloadOptions, DownloadProgress, Downloader, ProgressSink};
pub use error::{VodlError, VodlResult};
pub use fetch::HttpSource;
pub use util::http::HttpClient;

use std::{future::Future, sync::Arc};

use bytes::Bytes;
use futures::stream::BoxStream;

/// Body of a remote resource, delivered chunk by chunk.
pub type ByteStream = BoxStream<'static, VodlResult<Bytes>>;

/// ```text
/// playlist ──fetch──► parser ──segments──► Downloader ──fetch_streaming──► decrypt ──► staged files
///                                                                                          │
///                                                                   output.ts ◄──stitch────┘
/// ```
///
/// Where the bytes come from. Implementations know nothing about encryption or stitching.
///
/// Errors are expected to be one of [VodlError::NetworkTimeout],
/// [VodlError::UnexpectedStatus] and [VodlError::Connection], which are retried by the downloader.
pub trait SegmentSource: Send + Sync {
    /// Fetch a small resource such as a playlist or a key as a whole.
    fn fetch(&self, uri: &str) -> impl Future<Output = VodlResult<Bytes>> + Send;

    /// Fetch a segment body lazily, so progress can be reported before it is complete.
    fn fetch_streaming(&self, uri: &str) -> impl Future<Output = VodlResult<ByteStream>> + Send;
}

impl<S> SegmentSource for Arc<S>
where
    S: SegmentSource,
{
    fn fetch(&self, uri: &str) -> impl Future<Output = VodlResult<Bytes>> + Send {
        self.as_ref().fetch(uri)
    }

    fn fetch_streaming(&self, uri: &str) -> impl Future<Output = VodlResult<ByteStream>> + Send {
        self.as_ref().fetch_streaming(uri)
    }
}
