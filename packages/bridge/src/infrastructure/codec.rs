//! Wire codec for the plugin protocol.
//!
//! Frames are flat JSON objects carrying a `type` string next to the
//! variant's fields. Inbound frames are decoded straight into the closed
//! [`Envelope`] enum; nothing loosely typed leaves this module.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::domain::{DecodeError, EncodeError, Envelope};

use super::dto::websocket::{ChatMessage, MessageType, PlayerMessage, StatusMessage};

const TYPE_FIELD: &str = "type";

/// Decode one inbound frame.
///
/// Callers treat every error as "drop the frame".
pub fn decode(raw: &[u8]) -> Result<Envelope, DecodeError> {
    let text = std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8)?;
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let Value::Object(fields) = value else {
        return Err(DecodeError::Malformed(
            "frame is not a JSON object".to_string(),
        ));
    };

    let kind = match fields.get(TYPE_FIELD) {
        Some(Value::String(kind)) => {
            MessageType::parse(kind).ok_or_else(|| DecodeError::UnknownType(kind.clone()))?
        }
        Some(_) => {
            return Err(DecodeError::Malformed(
                "'type' must be a string".to_string(),
            ));
        }
        None => return Err(DecodeError::MissingType),
    };

    let fields = Value::Object(fields);
    match kind {
        MessageType::Status => parse_variant::<StatusMessage>(fields)?.try_into(),
        MessageType::Player => parse_variant::<PlayerMessage>(fields)?.try_into(),
        MessageType::Chat => parse_variant::<ChatMessage>(fields)?.try_into(),
    }
}

fn parse_variant<T: DeserializeOwned>(fields: Value) -> Result<T, DecodeError> {
    serde_json::from_value(fields).map_err(|e| DecodeError::Malformed(e.to_string()))
}

/// Encode an outbound frame as `{"type": kind, ...payload}`.
///
/// The payload must serialize to a JSON object; its fields are merged at the
/// top level. A `type` key inside the payload is overridden by `kind`.
pub fn encode<T: Serialize + ?Sized>(kind: &str, payload: &T) -> Result<String, EncodeError> {
    let payload =
        serde_json::to_value(payload).map_err(|e| EncodeError::Serialize(e.to_string()))?;
    let Value::Object(payload) = payload else {
        return Err(EncodeError::NotAnObject(kind.to_string()));
    };

    let mut frame = Map::with_capacity(payload.len() + 1);
    for (key, value) in payload {
        frame.insert(key, value);
    }
    frame.insert(TYPE_FIELD.to_string(), Value::String(kind.to_string()));

    serde_json::to_string(&Value::Object(frame)).map_err(|e| EncodeError::Serialize(e.to_string()))
}
