use std::time::Duration;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use reqwest::{header::HeaderMap, Response};

use crate::{
    catalog::SessionProvider,
    config::HttpConfig,
    error::{VodlError, VodlResult},
    util::http::HttpClient,
    ByteStream, SegmentSource,
};

/// [SegmentSource] over HTTP.
///
/// Headers, cookies and proxy are fixed per source. The timeout applies to each request
/// separately, including reading its body.
#[derive(Clone)]
pub struct HttpSource {
    client: HttpClient,
    headers: HeaderMap,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(client: HttpClient, timeout: Duration) -> Self {
        Self {
            client,
            headers: HeaderMap::new(),
            timeout,
        }
    }

    pub fn from_config(config: &HttpConfig) -> VodlResult<Self> {
        Ok(Self::new(HttpClient::from_config(config)?, config.timeout()))
    }

    /// Attach credentials supplied by a session provider.
    pub fn with_session<P>(mut self, provider: &P) -> VodlResult<Self>
    where
        P: SessionProvider + ?Sized,
    {
        self.headers.extend(provider.headers());
        let (url, cookies) = provider.cookies();
        if !cookies.is_empty() {
            self.client.add_cookies(cookies.as_slice(), url.as_str())?;
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn send(&self, uri: &str) -> VodlResult<Response> {
        let response = self
            .client
            .get(uri)
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| map_request_error(uri, self.timeout, e))?;

        if !response.status().is_success() {
            let status = response.status();
            if let Ok(body) = response.text().await {
                tracing::warn!("Error body: {body}");
            }
            return Err(VodlError::UnexpectedStatus {
                uri: uri.to_string(),
                status,
            });
        }

        Ok(response)
    }
}

impl SegmentSource for HttpSource {
    async fn fetch(&self, uri: &str) -> VodlResult<Bytes> {
        let response = self.send(uri).await?;
        response
            .bytes()
            .await
            .map_err(|e| map_request_error(uri, self.timeout, e))
    }

    async fn fetch_streaming(&self, uri: &str) -> VodlResult<ByteStream> {
        let response = self.send(uri).await?;
        let uri = uri.to_string();
        let timeout = self.timeout;
        Ok(response
            .bytes_stream()
            .map_err(move |e| map_request_error(&uri, timeout, e))
            .boxed())
    }
}

fn map_request_error(uri: &str, timeout: Duration, error: reqwest::Error) -> VodlError {
    if error.is_timeout() {
        VodlError::NetworkTimeout {
            uri: uri.to_string(),
            timeout,
        }
    } else {
        VodlError::Connection {
            uri: uri.to_string(),
            source: error,
        }
    }
}
