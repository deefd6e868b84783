//! JSON-RPC 2.0 types as defined in the specification
//!
//! This module implements the wire-level data structures from the JSON-RPC 2.0
//! specification (https://www.jsonrpc.org/specification). These types are
//! designed to be:
//!
//! - **Spec-compliant**: Strict adherence to JSON-RPC 2.0 requirements
//! - **Serializable**: Full serde support for JSON encoding/decoding
//! - **Loss-free**: A request with an absent `id` (a notification) is kept
//!   distinct from a request with a literal `null` id (a call)
//!
//! # Message Types
//!
//! A **Request** carries a method name, optional params, and an optional `id`.
//! When the `id` field is absent the request is a **Notification**: the server
//! must never send a response for it, not even an error. A **Response**
//! carries either a `result` or an `error`, never both, correlated to the
//! request by `id`.
//!
//! Incoming payloads are not assumed to be well-formed: malformed candidates
//! stay as raw `serde_json::Value`s and are classified by the
//! [`validate`](crate::validate) module. The typed structs here describe the
//! shapes that valid traffic takes.

use crate::error::ErrorData;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// JSON-RPC 2.0 request ID
///
/// The request identifier correlates a request with its response. The spec
/// allows string, integer, or null IDs; fractional numbers and booleans are
/// not valid IDs.
///
/// # Implementation Notes
///
/// The enum uses `#[serde(untagged)]` to serialize directly as the inner
/// value without a type discriminator, matching the wire format exactly.
/// `Number` holds `i64`, so a JSON number with a fractional part fails to
/// deserialize into an `Id` — which is what the grammar requires.
///
/// # Examples
///
/// ```rust
/// use jroh_core::Id;
///
/// let id1: Id = "req-123".into();
/// let id2: Id = 42i64.into();
///
/// assert_eq!(id1.to_string(), "\"req-123\"");
/// assert_eq!(id2.to_string(), "42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// String identifier - useful for UUIDs or correlation tokens
    String(String),
    /// Integer identifier - efficient for sequential request counters
    Number(i64),
    /// Null identifier - allowed by spec but makes correlation impossible
    Null,
}

impl Id {
    /// Extract an `Id` from a raw JSON value, if the value has an allowed type.
    ///
    /// Returns `None` for arrays, objects, booleans and non-integer numbers.
    pub fn from_value(value: &Value) -> Option<Id> {
        match value {
            Value::String(s) => Some(Id::String(s.clone())),
            Value::Number(n) => n.as_i64().map(Id::Number),
            Value::Null => Some(Id::Null),
            _ => None,
        }
    }

    /// Convert this ID into its raw JSON representation.
    pub fn into_value(self) -> Value {
        match self {
            Id::String(s) => Value::String(s),
            Id::Number(n) => Value::Number(n.into()),
            Id::Null => Value::Null,
        }
    }
}

impl fmt::Display for Id {
    /// Format the ID in a JSON-like representation: strings quoted, numbers
    /// as-is, null as "null".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "\"{}\"", s),
            Id::Number(n) => write!(f, "{}", n),
            Id::Null => write!(f, "null"),
        }
    }
}

// Convenience conversions to make ID creation ergonomic

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n)
    }
}

/// JSON-RPC 2.0 request message
///
/// Covers both calls and notifications: `id: None` means the `id` key was
/// absent on the wire (a notification), while `Some(Id::Null)` means the
/// literal `null` id (a call whose response carries a null id).
///
/// # Spec Compliance
///
/// A request MUST contain `jsonrpc` (exactly "2.0") and `method`, and MAY
/// contain `params` (array or object) and `id`. No other keys are permitted;
/// candidates with extra keys are rejected by
/// [`validate::request_is_valid`](crate::validate::request_is_valid).
///
/// # Examples
///
/// ```rust
/// use jroh_core::{Request, Id};
/// use serde_json::json;
///
/// let call = Request::call("subtract", Some(json!([42, 23])), Id::Number(1));
/// assert!(!call.is_notification());
///
/// let notif = Request::notification("update", Some(json!([1, 2, 3])));
/// assert!(notif.is_notification());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// JSON-RPC version - always "2.0"
    pub jsonrpc: String,
    /// Name of the method to invoke
    pub method: String,
    /// Optional parameters (array or object)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Request identifier; `None` when the key was absent (a notification)
    #[serde(
        default,
        deserialize_with = "id_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Id>,
}

/// Deserialize an `id` field that is present on the wire.
///
/// Without this, serde would map a literal `null` id to `None`, collapsing
/// the call/notification distinction.
fn id_present<'de, D>(deserializer: D) -> Result<Option<Id>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Id::deserialize(deserializer).map(Some)
}

impl Request {
    /// Create a call: a request that expects a response.
    pub fn call(method: impl Into<String>, params: Option<Value>, id: Id) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id: Some(id),
        }
    }

    /// Create a notification: a request with no `id` and no response.
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id: None,
        }
    }

    /// Whether this request is a notification (absent `id`).
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 response message
///
/// A response carries exactly one of `result` or `error`, plus the `id` of
/// the request it answers (`Id::Null` when the request id could not be
/// determined, e.g. for parse errors).
///
/// The mutual exclusion of `result` and `error` is enforced by construction
/// through the [`success`](Response::success) and [`error`](Response::error)
/// factories.
///
/// # Examples
///
/// ```rust
/// use jroh_core::{Response, ErrorData, Id};
/// use serde_json::json;
///
/// let ok = Response::success(json!(19), Id::Number(1));
/// assert!(ok.is_success());
///
/// let err = Response::error(ErrorData::method_not_found(), Id::String("5".into()));
/// assert!(err.is_error());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// JSON-RPC version - always "2.0"
    pub jsonrpc: String,
    /// Successful result (mutually exclusive with `error`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error information (mutually exclusive with `result`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorData>,
    /// Request ID from the original request
    pub id: Id,
}

impl Response {
    /// Create a successful response.
    pub fn success(result: Value, id: Id) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response.
    pub fn error(error: ErrorData, id: Id) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// True when `result` is present.
    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }

    /// True when `error` is present.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Convert this response into its raw JSON representation.
    ///
    /// Infallible by construction, unlike going through `serde_json::to_value`.
    pub fn into_value(self) -> Value {
        let mut map = Map::new();
        map.insert("jsonrpc".to_string(), Value::String(self.jsonrpc));
        if let Some(result) = self.result {
            map.insert("result".to_string(), result);
        }
        if let Some(error) = self.error {
            map.insert("error".to_string(), error.into_value());
        }
        map.insert("id".to_string(), self.id.into_value());
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorData;
    use serde_json::json;

    #[test]
    fn test_id_display() {
        assert_eq!(Id::String("test".to_string()).to_string(), "\"test\"");
        assert_eq!(Id::Number(42).to_string(), "42");
        assert_eq!(Id::Null.to_string(), "null");
    }

    #[test]
    fn test_id_from_value() {
        assert_eq!(Id::from_value(&json!("a")), Some(Id::String("a".into())));
        assert_eq!(Id::from_value(&json!(7)), Some(Id::Number(7)));
        assert_eq!(Id::from_value(&json!(null)), Some(Id::Null));
        assert_eq!(Id::from_value(&json!(1.5)), None);
        assert_eq!(Id::from_value(&json!(true)), None);
        assert_eq!(Id::from_value(&json!([1])), None);
    }

    #[test]
    fn test_request_serialization_skips_absent_id() {
        let notif = Request::notification("update", None);
        let encoded = serde_json::to_string(&notif).unwrap();
        assert!(!encoded.contains("\"id\""));

        let call = Request::call("update", None, Id::Null);
        let encoded = serde_json::to_string(&call).unwrap();
        assert!(encoded.contains("\"id\":null"));
    }

    #[test]
    fn test_request_null_id_stays_a_call() {
        let raw = r#"{"jsonrpc":"2.0","method":"test","id":null}"#;
        let request: Request = serde_json::from_str(raw).unwrap();
        assert_eq!(request.id, Some(Id::Null));
        assert!(!request.is_notification());

        let raw = r#"{"jsonrpc":"2.0","method":"test"}"#;
        let request: Request = serde_json::from_str(raw).unwrap();
        assert!(request.is_notification());
    }

    #[test]
    fn test_request_id_type_preserved() {
        let raw = r#"{"jsonrpc":"2.0","method":"test","id":"1"}"#;
        let request: Request = serde_json::from_str(raw).unwrap();
        assert_eq!(request.id, Some(Id::String("1".into())));

        let raw = r#"{"jsonrpc":"2.0","method":"test","id":0}"#;
        let request: Request = serde_json::from_str(raw).unwrap();
        assert_eq!(request.id, Some(Id::Number(0)));
    }

    #[test]
    fn test_response_success() {
        let resp = Response::success(json!({"status": "ok"}), Id::Number(1));
        assert!(resp.is_success());
        assert!(!resp.is_error());
    }

    #[test]
    fn test_response_error() {
        let resp = Response::error(ErrorData::internal_error(), Id::Number(1));
        assert!(!resp.is_success());
        assert!(resp.is_error());
    }

    #[test]
    fn test_response_into_value() {
        let value = Response::success(json!(19), Id::Number(1)).into_value();
        assert_eq!(value, json!({"jsonrpc": "2.0", "result": 19, "id": 1}));

        let value = Response::error(ErrorData::invalid_request(), Id::Null).into_value();
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32600, "message": "Invalid Request"},
                "id": null
            })
        );
    }
}
