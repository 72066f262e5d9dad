//! Run requests parsed from event payloads.

use serde_json::{Map, Value};

use crate::core::TriggerError;

/// Payload key that carries the pipeline spec location instead of a parameter
pub const SPEC_LOCATION_KEY: &str = "gcs_pipeline_file_location";

/// Run parameters passed through to the orchestration service
pub type RunParameters = Map<String, Value>;

/// A parsed run request.
///
/// The spec location is pulled out of the payload so that `parameters` only
/// ever holds values meant for the pipeline itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    /// Location named by the payload, if any (trimmed, never empty)
    pub spec_location: Option<String>,

    /// Remaining payload fields
    pub parameters: RunParameters,
}

impl RunRequest {
    /// Parse decoded payload text.
    ///
    /// The top-level value must be a JSON object. The reserved location key is
    /// removed whether or not it holds a usable value. `null` or a blank string
    /// count as absent; any other non-string value is rejected.
    pub fn parse(text: &str) -> Result<Self, TriggerError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| TriggerError::Parsing(format!("payload is not valid JSON: {}", e)))?;

        let mut parameters = match value {
            Value::Object(map) => map,
            other => {
                return Err(TriggerError::Parsing(format!(
                    "payload must be a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let spec_location = match parameters.remove(SPEC_LOCATION_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(location)) => {
                Some(location.trim().to_string()).filter(|l| !l.is_empty())
            }
            Some(other) => {
                return Err(TriggerError::Parsing(format!(
                    "{} must be a string, got {}",
                    SPEC_LOCATION_KEY,
                    json_kind(&other)
                )))
            }
        };

        Ok(Self {
            spec_location,
            parameters,
        })
    }

    /// Pick the payload location, falling back to the configured default.
    ///
    /// The returned location is trimmed, so the existence check and the
    /// submission see the same string.
    pub fn resolve_spec_location(&self, default: Option<&str>) -> Result<String, TriggerError> {
        self.spec_location
            .as_deref()
            .or(default.map(str::trim).filter(|d| !d.is_empty()))
            .map(str::to_string)
            .ok_or(TriggerError::MissingLocation)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
