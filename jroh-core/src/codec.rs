//! Payload classification and JSON encoding helpers
//!
//! The dispatcher receives its input as an already-deserialized
//! `serde_json::Value` (body parsing from raw bytes is an external
//! collaborator). This module splits that value into the two shapes the
//! protocol distinguishes - a single candidate object or a batch array - and
//! provides the encode/decode helpers the transport edge needs.
//!
//! Batch items stay raw `Value`s on purpose: every item is validated and
//! resolved independently, and a malformed item must not poison its
//! neighbours.

use crate::error::{Error, ErrorData, Result};
use crate::types::Response;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// An incoming JSON-RPC payload, after body parsing but before validation.
///
/// An empty `Batch` is preserved as-is: the empty-batch rule (a single
/// Invalid-Request response, not an empty array) belongs to the dispatcher's
/// shape check, not the codec.
#[derive(Debug, Clone)]
pub enum Payload {
    /// A single candidate request object (possibly malformed)
    Single(Value),
    /// A batch: an ordered sequence of candidate items
    Batch(Vec<Value>),
}

impl Payload {
    /// Split a raw value on array-ness: arrays become batches, everything
    /// else is a single candidate.
    pub fn classify(value: Value) -> Payload {
        match value {
            Value::Array(items) => Payload::Batch(items),
            other => Payload::Single(other),
        }
    }

    /// Number of candidate items carried.
    pub fn len(&self) -> usize {
        match self {
            Payload::Single(_) => 1,
            Payload::Batch(items) => items.len(),
        }
    }

    /// True for an empty batch.
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Batch(items) if items.is_empty())
    }

    /// True when this payload is a batch.
    pub fn is_batch(&self) -> bool {
        matches!(self, Payload::Batch(_))
    }

    /// View the candidate items uniformly, single or batch.
    pub fn items(&self) -> &[Value] {
        match self {
            Payload::Single(value) => std::slice::from_ref(value),
            Payload::Batch(items) => items.as_slice(),
        }
    }
}

/// Decode a JSON string into a payload.
///
/// Any parse failure maps to the Parse-error code (-32700); the caller turns
/// that into the single Parse-error response the protocol requires.
pub fn decode_payload(data: &str) -> Result<Payload> {
    let value: Value = serde_json::from_str(data).map_err(|e| {
        debug!(error = %e, "payload failed to parse");
        Error::JsonRpc(ErrorData::parse_error())
    })?;
    Ok(Payload::classify(value))
}

/// Encode any serializable message to a JSON string.
pub fn encode<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode a batch of responses to a JSON array string.
pub fn encode_responses(responses: &[Response]) -> Result<String> {
    serde_json::to_string(responses).map_err(|e| Error::Serialization(e.to_string()))
}
