//! Invocation configuration.
//!
//! Configuration comes from the process environment and is read once at the
//! start of every invocation. Nothing is cached between invocations.
//!
//! Variables:
//! - `PROJECT` (required)
//! - `REGION` (required)
//! - `GCS_PIPELINE_FILE_LOCATION` (fallback pipeline spec location)
//! - `GOOGLE_OAUTH_ACCESS_TOKEN` (bearer token; metadata server otherwise)
//! - `VERTEX_API_ENDPOINT`, `STORAGE_API_ENDPOINT` (endpoint overrides)

use std::fmt;

use crate::core::TriggerError;

pub const ENV_PROJECT: &str = "PROJECT";
pub const ENV_REGION: &str = "REGION";
pub const ENV_SPEC_LOCATION: &str = "GCS_PIPELINE_FILE_LOCATION";
pub const ENV_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
pub const ENV_VERTEX_ENDPOINT: &str = "VERTEX_API_ENDPOINT";
pub const ENV_STORAGE_ENDPOINT: &str = "STORAGE_API_ENDPOINT";

/// Resolved configuration for a single invocation
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Cloud project that owns the pipeline jobs
    pub project: String,
    /// Region the pipeline jobs run in
    pub region: String,
    /// Spec location used when the payload does not name one
    pub default_spec_location: Option<String>,
    /// Static bearer token for API calls
    pub access_token: Option<String>,
    /// Override for the orchestration API base URL
    pub api_endpoint: Option<String>,
    /// Override for the object store base URL
    pub storage_endpoint: Option<String>,
}

impl Config {
    /// Build a config with only the required values set
    pub fn new(project: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            region: region.into(),
            default_spec_location: None,
            access_token: None,
            api_endpoint: None,
            storage_endpoint: None,
        }
    }

    /// Set the fallback spec location
    pub fn with_default_spec_location(mut self, location: impl Into<String>) -> Self {
        self.default_spec_location = Some(location.into());
        self
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, TriggerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup function.
    ///
    /// Empty values count as unset. `PROJECT` is checked before `REGION`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TriggerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let project = get(ENV_PROJECT).ok_or_else(|| {
            TriggerError::Configuration(format!("Environment variable {} is not set", ENV_PROJECT))
        })?;
        let region = get(ENV_REGION).ok_or_else(|| {
            TriggerError::Configuration(format!("Environment variable {} is not set", ENV_REGION))
        })?;

        Ok(Self {
            project,
            region,
            default_spec_location: get(ENV_SPEC_LOCATION),
            access_token: get(ENV_ACCESS_TOKEN),
            api_endpoint: get(ENV_VERTEX_ENDPOINT),
            storage_endpoint: get(ENV_STORAGE_ENDPOINT),
        })
    }

    /// Base URL of the regional Vertex AI endpoint
    pub fn vertex_endpoint(&self) -> String {
        self.api_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", self.region))
    }
}

// Hand-written so the access token never ends up in logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("project", &self.project)
            .field("region", &self.region)
            .field("default_spec_location", &self.default_spec_location)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("api_endpoint", &self.api_endpoint)
            .field("storage_endpoint", &self.storage_endpoint)
            .finish()
    }
}
