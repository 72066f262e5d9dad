//! Cloud Storage adapter using the JSON API.
//!
//! Endpoint: GET /storage/v1/b/{bucket}/o/{object}
//! Auth: Bearer token

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use tracing::debug;

use super::{ObjectStore, TokenSource};
use crate::domain::ObjectLocation;

pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

/// Cloud Storage client
pub struct GcsObjectStore {
    endpoint: String,
    tokens: TokenSource,
    client: reqwest::Client,
}

impl GcsObjectStore {
    /// Create a client against the public endpoint
    pub fn new(tokens: TokenSource) -> Self {
        Self::with_endpoint(DEFAULT_STORAGE_ENDPOINT, tokens)
    }

    /// Create a client against a custom endpoint (emulators, proxies)
    pub fn with_endpoint(endpoint: impl Into<String>, tokens: TokenSource) -> Self {
        Self {
            endpoint: endpoint.into(),
            tokens,
            client: reqwest::Client::new(),
        }
    }

    /// Build the metadata URL for an object.
    ///
    /// The object name is a single path segment, so any `/` in it is encoded.
    fn object_url(&self, location: &ObjectLocation) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid storage endpoint: {}", self.endpoint))?;

        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Storage endpoint cannot be a base URL: {}", self.endpoint))?
            .pop_if_empty()
            .extend([
                "storage",
                "v1",
                "b",
                location.bucket.as_str(),
                "o",
                location.object.as_str(),
            ]);

        Ok(url)
    }

    fn media_url(&self, location: &ObjectLocation) -> Result<Url> {
        let mut url = self.object_url(location)?;
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    fn name(&self) -> &str {
        "gcs"
    }

    async fn exists(&self, location: &ObjectLocation) -> Result<bool> {
        let url = self.object_url(location)?;
        let token = self.tokens.token().await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Failed to query {}", location))?;

        let status = response.status();
        debug!(%location, %status, "Object metadata lookup");

        match status {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => {
                let text = response.text().await.unwrap_or_default();
                anyhow::bail!("Cloud Storage error ({}) for {}: {}", status, location, text)
            }
        }
    }

    async fn read(&self, location: &ObjectLocation) -> Result<Vec<u8>> {
        let url = self.media_url(location)?;
        let token = self.tokens.token().await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", location))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Cloud Storage error ({}) for {}: {}", status, location, text);
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", location))?;

        Ok(bytes.to_vec())
    }
}
