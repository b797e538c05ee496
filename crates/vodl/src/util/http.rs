use std::{
    ops::Deref,
    sync::{Arc, PoisonError},
};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, ClientBuilder, IntoUrl, Proxy,
};
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};

use crate::{
    config::HttpConfig,
    error::{VodlError, VodlResult},
};

/// A reqwest client sharing one cookie jar.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    cookies_store: Arc<CookieStoreMutex>,
}

impl HttpClient {
    pub fn new(builder: ClientBuilder) -> VodlResult<Self> {
        let cookies_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let client = builder.cookie_provider(cookies_store.clone()).build()?;

        Ok(Self {
            client,
            cookies_store,
        })
    }

    pub fn from_config(config: &HttpConfig) -> VodlResult<Self> {
        let user_agent = config
            .user_agent
            .as_deref()
            .unwrap_or_else(|| fake_user_agent::get_chrome_rua());

        let mut builder = Client::builder()
            .user_agent(user_agent)
            .default_headers(parse_headers(&config.headers)?);
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        let client = Self::new(builder)?;
        if let Some(url) = &config.cookie_url {
            client.add_cookies(config.cookies.as_slice(), url.as_str())?;
        } else if !config.cookies.is_empty() {
            tracing::warn!("Cookies are ignored because cookie_url is not set.");
        }
        Ok(client)
    }

    pub fn add_cookies<S>(&self, cookies: &[S], url: impl IntoUrl) -> VodlResult<()>
    where
        S: AsRef<str>,
    {
        let url = url.into_url()?;
        let mut lock = self
            .cookies_store
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for cookie in cookies {
            if let Err(e) = lock.parse(cookie.as_ref(), &url) {
                tracing::warn!("Ignored invalid cookie {}: {e}", cookie.as_ref());
            }
        }
        Ok(())
    }
}

impl Deref for HttpClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

pub fn parse_headers<'a, I>(headers: I) -> VodlResult<HeaderMap>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| VodlError::InvalidHeader(name.clone()))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| VodlError::InvalidHeader(format!("{name}: {value}")))?;
        map.insert(name, value);
    }
    Ok(map)
}
