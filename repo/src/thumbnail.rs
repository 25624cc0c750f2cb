//! Thumbnail image loading through the shared byte-bounded cache.

use async_trait::async_trait;
use bytes::Bytes;
use geofeed_cache::BoundedCache;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::entity::Media;
use crate::error::RepoError;
use crate::guard::guarded;

/// MediaLoader fetches raw image bytes for a URL.
#[async_trait]
pub trait MediaLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<Bytes, RepoError>;
}

/// Loads images over HTTP.
pub struct HttpMediaLoader {
    client: Client,
}

impl HttpMediaLoader {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpMediaLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaLoader for HttpMediaLoader {
    async fn load(&self, url: &str) -> Result<Bytes, RepoError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RepoError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(RepoError::RemoteUnavailable(format!("HTTP {status}: {url}")));
        }
        Ok(resp.bytes().await?)
    }
}

#[async_trait]
impl<L: MediaLoader + ?Sized> MediaLoader for std::sync::Arc<L> {
    async fn load(&self, url: &str) -> Result<Bytes, RepoError> {
        (**self).load(url).await
    }
}

/// ThumbnailResolver serves thumbnail bytes keyed by URL.
///
/// Each image is cached at a cost equal to its byte length, so the cache limit
/// is a memory ceiling. An image larger than the ceiling is still returned to
/// the caller; it is just never cached.
pub struct ThumbnailResolver<L> {
    loader: L,
    cache: BoundedCache<String, Bytes>,
}

impl<L: MediaLoader> ThumbnailResolver<L> {
    pub fn new(loader: L, cache: BoundedCache<String, Bytes>) -> Self {
        Self { loader, cache }
    }

    pub fn cache(&self) -> &BoundedCache<String, Bytes> {
        &self.cache
    }

    /// Returns the image at `url`, loading it on a cache miss.
    pub async fn resolve(&self, url: &str, cancel: &CancellationToken) -> Result<Bytes, RepoError> {
        if let Some(hit) = self.cache.get(url) {
            return Ok(hit);
        }
        let bytes = guarded(self.loader.load(url), None, cancel).await?;
        debug!(url, size = bytes.len(), "repo: thumbnail loaded");
        self.cache.set(url.to_string(), bytes.clone(), bytes.len());
        Ok(bytes)
    }

    /// Resolves the thumbnail of `media`.
    pub async fn resolve_for(
        &self,
        media: &Media,
        cancel: &CancellationToken,
    ) -> Result<Bytes, RepoError> {
        self.resolve(&media.thumbnail_url, cancel).await
    }
}
