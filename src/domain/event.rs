//! Inbound events delivered by the message queue.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::TriggerError;

/// A single event as delivered to the function.
///
/// `data` is the base64-encoded message body; `context` is opaque invocation
/// metadata that is only ever logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationEvent {
    pub data: String,

    #[serde(default)]
    pub context: Value,
}

impl InvocationEvent {
    /// Create an event from already-encoded data
    pub fn new(data: impl Into<String>, context: Value) -> Self {
        Self {
            data: data.into(),
            context,
        }
    }

    /// Encode a JSON document into an event body
    pub fn from_json(payload: &Value) -> Self {
        let encoded = STANDARD.encode(payload.to_string());
        Self::new(encoded, Value::Null)
    }

    /// Decode `data` from base64 and then UTF-8
    pub fn decode_payload(&self) -> Result<String, TriggerError> {
        let bytes = STANDARD
            .decode(self.data.trim())
            .map_err(|e| TriggerError::Decoding(format!("invalid base64: {}", e)))?;

        String::from_utf8(bytes)
            .map_err(|e| TriggerError::Decoding(format!("invalid UTF-8: {}", e)))
    }
}

/// Body of a Pub/Sub push request
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,

    #[serde(default)]
    pub subscription: Option<String>,
}

/// The message part of a push request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    #[serde(default)]
    pub data: String,

    #[serde(default)]
    pub attributes: HashMap<String, String>,

    #[serde(default)]
    pub message_id: Option<String>,

    #[serde(default)]
    pub publish_time: Option<String>,
}

impl From<PushEnvelope> for InvocationEvent {
    fn from(envelope: PushEnvelope) -> Self {
        let PushEnvelope {
            message,
            subscription,
        } = envelope;

        let context = json!({
            "event_id": message.message_id,
            "timestamp": message.publish_time,
            "attributes": message.attributes,
            "subscription": subscription,
        });

        InvocationEvent::new(message.data, context)
    }
}
