//! Domain types for the pipeline trigger.
//!
//! This module contains the core data structures:
//! - InvocationEvent: the message as delivered by the queue
//! - RunRequest: spec location and run parameters parsed from the payload
//! - ObjectLocation: bucket/object split of a storage location

pub mod event;
pub mod location;
pub mod request;

// Re-export commonly used types
pub use event::{InvocationEvent, PushEnvelope, PushMessage};
pub use location::ObjectLocation;
pub use request::{RunParameters, RunRequest, SPEC_LOCATION_KEY};
