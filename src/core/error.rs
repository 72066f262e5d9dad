//! Errors that end an invocation.

use thiserror::Error;

/// Why an invocation failed.
///
/// Every variant is terminal: nothing is retried here, the host decides
/// whether to redeliver the message.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to decode event data: {0}")]
    Decoding(String),

    #[error("failed to parse event payload: {0}")]
    Parsing(String),

    #[error("GCS_PIPELINE_FILE_LOCATION is not set in either the message payload or the environment")]
    MissingLocation,

    #[error("{location} does not exist")]
    ArtifactNotFound { location: String },

    #[error("failed to check {location}: {source}")]
    Storage {
        location: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("pipeline run submission failed: {0}")]
    Submission(#[source] anyhow::Error),
}

impl TriggerError {
    /// Short machine-friendly name, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Decoding(_) => "decoding",
            Self::Parsing(_) => "parsing",
            Self::MissingLocation => "missing_location",
            Self::ArtifactNotFound { .. } => "artifact_not_found",
            Self::Storage { .. } => "storage",
            Self::Submission(_) => "submission",
        }
    }
}
