//! Bearer tokens for Google API calls.
//!
//! Credentials belong to the hosting runtime. A token is either handed over
//! through configuration or fetched from the runtime's metadata server.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default service account token endpoint on the metadata server
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Where API calls get their bearer token from
#[derive(Clone)]
pub enum TokenSource {
    /// A fixed token supplied by the environment
    Static(String),

    /// The hosting runtime's metadata server
    Metadata { url: String, client: reqwest::Client },
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

impl TokenSource {
    /// Use `token` if given, else the metadata server
    pub fn from_option(token: Option<String>) -> Self {
        match token {
            Some(token) => Self::Static(token),
            None => Self::metadata(),
        }
    }

    pub fn metadata() -> Self {
        Self::Metadata {
            url: METADATA_TOKEN_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch a token for one request
    pub async fn token(&self) -> Result<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Metadata { url, client } => {
                let response = client
                    .get(url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .context("Failed to reach metadata server")?;

                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    anyhow::bail!("Metadata server error ({}): {}", status, text);
                }

                let token: MetadataToken = response
                    .json()
                    .await
                    .context("Failed to parse metadata token response")?;
                Ok(token.access_token)
            }
        }
    }
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("TokenSource::Static(<redacted>)"),
            Self::Metadata { url, .. } => write!(f, "TokenSource::Metadata({})", url),
        }
    }
}
