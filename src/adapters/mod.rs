//! Adapter interfaces for external systems.
//!
//! The trigger talks to two services: an object store that holds compiled
//! pipeline specs, and the orchestration service that runs them. Both sit
//! behind small traits so the handler can run against in-memory fakes.

pub mod auth;
pub mod gcs;
pub mod vertex;

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{ObjectLocation, RunParameters};

pub use auth::TokenSource;
pub use gcs::GcsObjectStore;
pub use vertex::VertexOrchestrator;

/// Result of a run submission.
///
/// Opaque to the trigger; it is logged and handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RunHandle(pub Value);

impl RunHandle {
    /// Resource name of the submitted job, if the service returned one
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl fmt::Display for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Blob storage holding pipeline specs
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Whether the object exists
    async fn exists(&self, location: &ObjectLocation) -> Result<bool>;

    /// Download the object's contents
    async fn read(&self, location: &ObjectLocation) -> Result<Vec<u8>>;
}

/// Service that accepts pipeline runs
#[async_trait]
pub trait PipelineOrchestrator: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Start a run of the spec at `spec_location` with the given parameters
    async fn submit_run(&self, spec_location: &str, parameters: &RunParameters)
        -> Result<RunHandle>;
}
