//! Core trigger logic.
//!
//! This module contains:
//! - TriggerHandler: the decode, validate and submit sequence
//! - TriggerError: the ways an invocation can fail

pub mod error;
pub mod handler;

// Re-export commonly used types
pub use error::TriggerError;
pub use handler::TriggerHandler;
