//! HTTP client with a transparent on-disk response cache.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, Url};
use storage::{CacheKey, ResponseCache};
use tracing::{debug, info, instrument};

use crate::{Result, SourceError};

/// Default request timeout. Provider exports of large extents are slow.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A `reqwest` client whose successful responses go through a [`ResponseCache`].
///
/// Only HTTP 200 responses are cached. When a live request fails and the cache
/// holds an expired entry for it, the expired entry is served instead.
#[derive(Clone)]
pub struct CachedHttpClient {
    client: Client,
    cache: Option<Arc<ResponseCache>>,
}

impl CachedHttpClient {
    pub fn new(timeout: Duration, cache: Option<Arc<ResponseCache>>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("flood-alert/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::transport("client", e))?;

        Ok(Self { client, cache })
    }

    /// A client without a response cache.
    pub fn uncached() -> Result<Self> {
        Self::new(DEFAULT_TIMEOUT, None)
    }

    pub fn cache(&self) -> Option<&Arc<ResponseCache>> {
        self.cache.as_ref()
    }

    /// Cache key used for a GET of `url`.
    pub fn get_key(url: &Url) -> CacheKey {
        CacheKey::new("GET", url.as_str(), &[])
    }

    /// Cache key used for a form POST of `form` to `url`.
    pub fn post_form_key(url: &Url, form: &[(String, String)]) -> Result<CacheKey> {
        let body = serde_json::to_vec(form).map_err(|e| SourceError::decode("form", e))?;
        Ok(CacheKey::new("POST", url.as_str(), &body))
    }

    /// GET `url` and return the body of a 200 response.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: Url) -> Result<Bytes> {
        let key = Self::get_key(&url);
        let request = self.client.get(url.clone());
        self.send_cached(&key, url, request).await
    }

    /// POST `form` url-encoded to `url` and return the body of a 200 response.
    #[instrument(skip(self, form), fields(url = %url, fields = form.len()))]
    pub async fn post_form(&self, url: Url, form: &[(String, String)]) -> Result<Bytes> {
        let key = Self::post_form_key(&url, form)?;
        let request = self.client.post(url.clone()).form(form);
        self.send_cached(&key, url, request).await
    }

    async fn send_cached(&self, key: &CacheKey, url: Url, request: reqwest::RequestBuilder) -> Result<Bytes> {
        match &self.cache {
            Some(cache) => cache.get_or_fetch(key, || send(url, request)).await,
            None => send(url, request).await,
        }
    }
}

async fn send(url: Url, request: reqwest::RequestBuilder) -> Result<Bytes> {
    info!(url = %url, "Requesting");

    let response = request
        .send()
        .await
        .map_err(|e| SourceError::transport(url.as_str(), e))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(SourceError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| SourceError::transport(url.as_str(), e))?;

    debug!(url = %url, bytes = body.len(), "Response received");
    Ok(body)
}
