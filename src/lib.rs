//! pipeline-trigger - launch Vertex AI pipeline runs from Pub/Sub events
//!
//! Each invocation takes one queue event, decodes its base64 JSON payload,
//! works out which compiled pipeline spec to run, checks that the spec exists
//! in Cloud Storage and submits a pipeline job.
//!
//! # Modules
//!
//! - `adapters`: External system integrations (Cloud Storage, Vertex AI)
//! - `core`: Trigger handler and its error type
//! - `domain`: Data structures (InvocationEvent, RunRequest, ObjectLocation)
//! - `config`: Per-invocation configuration from the environment
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Build an event from run parameters and trigger it
//! echo '{"gcs_pipeline_file_location": "gs://b/spec.json", "alpha": 1}' \
//!     | pipeline-trigger encode \
//!     | PROJECT=proj REGION=us-central1 pipeline-trigger trigger
//! ```
//!
//! Redelivered events are submitted again; there is no deduplication.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{ObjectStore, PipelineOrchestrator, RunHandle};
pub use config::Config;
pub use self::core::{TriggerError, TriggerHandler};
pub use domain::{InvocationEvent, ObjectLocation, RunParameters, RunRequest};
