//! Downloads receipt images from the URL given by the client.

use async_trait::async_trait;
use reqwest::Client;

use crate::Error;

/// Retrieves the raw bytes behind an image URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Download the bytes at `url`.
    ///
    /// # Errors
    /// Implementations return [Error::UpstreamFetchFailed] for any failure.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, Error>;
}

/// An [ImageFetcher] that downloads images over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpImageFetcher {
    http: Client,
}

impl HttpImageFetcher {
    /// Create a fetcher with a default HTTP client.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    /// Download the bytes at `url`.
    ///
    /// A response with a non-success status is a failed fetch, the error page
    /// is never handed on as an image.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, Error> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|error| Error::UpstreamFetchFailed(format!("GET {url} failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamFetchFailed(format!(
                "GET {url} returned {status}"
            )));
        }

        let bytes = response.bytes().await.map_err(|error| {
            Error::UpstreamFetchFailed(format!("could not read the body of {url}: {error}"))
        })?;

        tracing::debug!("Fetched {} bytes from {url}", bytes.len());

        Ok(bytes.to_vec())
    }
}
