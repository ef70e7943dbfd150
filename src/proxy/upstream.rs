//! HTTP cover sources.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use super::request::CoverRequest;
use crate::error::CoverError;

/// Fetches a cover URL.
///
/// Any failure (transport error, timeout, non-2xx status) is an
/// [`CoverError::Upstream`]; the proxy moves on to the next candidate.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, CoverError>;
}

/// `reqwest`-backed upstream with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(timeout: Duration) -> Result<Self, CoverError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("picocover/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| CoverError::Upstream(format!("HTTP client error: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self, url: &str) -> Result<Bytes, CoverError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CoverError::Upstream(format!("Failed to download {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(CoverError::Upstream(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }
        response
            .bytes()
            .await
            .map_err(|e| CoverError::Upstream(format!("Failed to read {}: {}", url, e)))
    }
}

/// Secondary GBA cover source consulted after the object store missed.
///
/// Reserved for a second GBA provider. No implementation ships with the
/// crate and [`super::CoverProxy`] runs without one unless
/// [`super::CoverProxy::with_fallback`] is called. Bytes returned here
/// follow the upstream path: cached and tagged `MISS`.
#[async_trait]
pub trait FallbackSource: Send + Sync {
    async fn fetch(&self, request: &CoverRequest) -> Result<Option<Bytes>, CoverError>;
}
