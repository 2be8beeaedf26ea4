//! Request and response bodies.

use crate::error::{ProtocolError, ProtocolResult};
use playersync_core::{Changeset, ValueCell};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Encodes a key/value mapping as a JSON object.
///
/// Non-finite floats have no JSON form and are rejected.
pub fn encode_mapping(changes: &Changeset) -> ProtocolResult<Vec<u8>> {
    if let Some((key, _)) = changes
        .iter()
        .find(|(_, v)| matches!(v, ValueCell::Float(f) if !f.is_finite()))
    {
        return Err(ProtocolError::encode(format!(
            "non-finite float under key {key:?}"
        )));
    }
    serde_json::to_vec(changes).map_err(ProtocolError::encode)
}

/// Decodes a JSON object of scalars into a mapping.
///
/// An empty body or a JSON `null` decodes to an empty mapping. Any other
/// non-object body, and any entry that is not a scalar, is an error.
pub fn decode_mapping(bytes: &[u8]) -> ProtocolResult<Changeset> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Changeset::new());
    }

    let value: Value = serde_json::from_slice(bytes).map_err(ProtocolError::decode)?;
    match value {
        Value::Null => Ok(Changeset::new()),
        Value::Object(entries) => entries
            .into_iter()
            .map(|(key, value)| match scalar(&value) {
                Some(cell) => Ok((key, cell)),
                None => Err(ProtocolError::UnexpectedShape {
                    expected: "scalar",
                    found: json_kind(&value),
                    key: Some(key),
                }),
            })
            .collect(),
        other => Err(ProtocolError::UnexpectedShape {
            expected: "object",
            found: json_kind(&other),
            key: None,
        }),
    }
}

/// Encodes a list of keys as a JSON array.
pub fn encode_delete(keys: &[String]) -> ProtocolResult<Vec<u8>> {
    serde_json::to_vec(keys).map_err(ProtocolError::encode)
}

/// Decodes a JSON array of keys.
pub fn decode_delete(bytes: &[u8]) -> ProtocolResult<Vec<String>> {
    serde_json::from_slice(bytes).map_err(ProtocolError::decode)
}

/// Body returned by the backend for save and delete requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckBody {
    /// Whether the request was applied.
    pub success: bool,
    /// Human-readable outcome.
    #[serde(default)]
    pub message: String,
}

impl AckBody {
    /// Creates a successful acknowledgement.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Creates a failed acknowledgement.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(ProtocolError::encode)
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(ProtocolError::decode)
    }
}

fn scalar(value: &Value) -> Option<ValueCell> {
    match value {
        Value::Bool(b) => Some(ValueCell::Boolean(*b)),
        Value::String(s) => Some(ValueCell::Text(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(ValueCell::Integer)
            .or_else(|| n.as_f64().map(ValueCell::Float)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
