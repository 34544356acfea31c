use crate::error::protocol::ProtocolError;
use crate::stream::InboundFrame;

use common::ErrorLocation;

use std::panic::Location;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fields this client reads from an inbound frame.
///
/// Everything else in the frame is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InboundEnvelope {
    #[serde(default)]
    pub envelope_id: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Reply to a frame that carried an envelope id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acknowledgment {
    envelope_id: String,
}

impl Acknowledgment {
    pub fn envelope_id(&self) -> &str {
        &self.envelope_id
    }

    /// Wire form: `{"envelope_id":"<id>"}`.
    #[track_caller]
    pub fn to_frame(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialize {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

/// Partially decode a frame.
///
/// # Errors
///
/// - [`ProtocolError::Malformed`] if the payload is not JSON, or `envelope_id` /
///   `type` are present with a non-string value
/// - [`ProtocolError::NotAnObject`] if the top level is valid JSON but not an object
#[track_caller]
pub fn decode_frame(frame: &InboundFrame) -> Result<InboundEnvelope, ProtocolError> {
    let value: Value = serde_json::from_slice(frame.as_bytes())?;

    if !value.is_object() {
        return Err(ProtocolError::NotAnObject {
            message: format!("expected a JSON object, got {}", json_kind(&value)),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    Ok(serde_json::from_value(value)?)
}

/// The acknowledgment owed for `envelope`, if any.
pub fn acknowledgment_for(envelope: &InboundEnvelope) -> Option<Acknowledgment> {
    envelope
        .envelope_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .map(|id| Acknowledgment {
            envelope_id: id.to_string(),
        })
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
