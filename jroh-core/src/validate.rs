//! Validation of candidate JSON-RPC 2.0 values
//!
//! Incoming traffic is arbitrary JSON: anything from a perfectly valid call
//! to a bare number in the middle of a batch. The functions here classify
//! raw `serde_json::Value`s against the JSON-RPC 2.0 grammar. They are pure
//! (no side effects, same verdict on every invocation) so they can run
//! concurrently over batch items without coordination.
//!
//! # Grammar
//!
//! A valid request is a keyed object whose `jsonrpc` equals the literal
//! "2.0", whose `method` is a non-empty trimmed string, whose `id` (when the
//! key is present) is a string, integer, or null, whose `params` (when
//! present) is an array or object, and which carries no other keys.
//!
//! A request lacking the `id` key is a notification and never receives a
//! response entry. Note that `id: null` is *not* a notification: the key is
//! present.
//!
//! # Invalid-request mapping
//!
//! [`handle_invalid_request`] maps a defective candidate to its error
//! response. The checks run in a fixed order and the first match wins; an
//! object with both a bad `method` and bad `params` reports -32600, not
//! -32602. This tie-break is deliberate and tested.

use crate::error::{is_reserved_code, ErrorData};
use crate::types::{Id, Response};
use serde_json::Value;

/// Keys a request object may carry.
const REQUEST_KEYS: [&str; 4] = ["jsonrpc", "method", "params", "id"];
/// Keys a response object may carry.
const RESPONSE_KEYS: [&str; 4] = ["jsonrpc", "id", "result", "error"];
/// Keys an error object may carry.
const ERROR_KEYS: [&str; 3] = ["code", "message", "data"];

/// Whether a method name is acceptable at the protocol level: a non-empty
/// string once trimmed.
///
/// The reserved `"rpc."` prefix is *not* checked here - that restriction
/// applies to user registration and is enforced by the method registry, not
/// by dispatch-time validation.
pub fn method_name_is_valid(name: &str) -> bool {
    !name.trim().is_empty()
}

fn version_is_valid(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if s == "2.0")
}

fn method_is_valid(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if method_name_is_valid(s))
}

/// Whether a value has an allowed id type: string, integer, or null.
pub fn id_is_valid(value: &Value) -> bool {
    match value {
        Value::String(_) | Value::Null => true,
        Value::Number(n) => n.as_i64().is_some(),
        _ => false,
    }
}

/// Whether a value has an allowed params shape: array or keyed object.
pub fn params_is_valid(value: &Value) -> bool {
    value.is_array() || value.is_object()
}

/// Whether a candidate is a valid JSON-RPC 2.0 request object.
pub fn request_is_valid(candidate: &Value) -> bool {
    let Some(obj) = candidate.as_object() else {
        return false;
    };
    if !version_is_valid(obj.get("jsonrpc")) {
        return false;
    }
    if !method_is_valid(obj.get("method")) {
        return false;
    }
    if let Some(id) = obj.get("id") {
        if !id_is_valid(id) {
            return false;
        }
    }
    if let Some(params) = obj.get("params") {
        if !params_is_valid(params) {
            return false;
        }
    }
    obj.keys().all(|k| REQUEST_KEYS.contains(&k.as_str()))
}

/// Whether a candidate is a notification: a keyed object with no `id` key.
///
/// Only meaningful for objects; any non-object candidate is not a
/// notification (it will fail validation and produce an error entry).
pub fn is_notification(candidate: &Value) -> bool {
    candidate
        .as_object()
        .map(|obj| !obj.contains_key("id"))
        .unwrap_or(false)
}

fn error_object_is_valid(candidate: &Value) -> bool {
    let Some(obj) = candidate.as_object() else {
        return false;
    };
    let code_ok = obj
        .get("code")
        .and_then(Value::as_i64)
        .map(is_reserved_code)
        .unwrap_or(false);
    if !code_ok {
        return false;
    }
    obj.keys().all(|k| ERROR_KEYS.contains(&k.as_str()))
}

/// Whether a candidate is a valid JSON-RPC 2.0 response object: correct
/// version, optional valid id, exactly one of `result`/`error`, a
/// registry-valid error object when present, and no extra keys.
pub fn response_is_valid(candidate: &Value) -> bool {
    let Some(obj) = candidate.as_object() else {
        return false;
    };
    if !version_is_valid(obj.get("jsonrpc")) {
        return false;
    }
    if let Some(id) = obj.get("id") {
        if !id_is_valid(id) {
            return false;
        }
    }
    match (obj.get("result"), obj.get("error")) {
        (Some(_), Some(_)) | (None, None) => return false,
        (None, Some(error)) => {
            if !error_object_is_valid(error) {
                return false;
            }
        }
        (Some(_), None) => {}
    }
    obj.keys().all(|k| RESPONSE_KEYS.contains(&k.as_str()))
}

/// The candidate's id for error reporting: copied when present with an
/// allowed type, null otherwise. Types are preserved exactly - an integer id
/// of 0 stays 0.
pub fn copied_id(candidate: &Value) -> Id {
    candidate
        .get("id")
        .and_then(Id::from_value)
        .unwrap_or(Id::Null)
}

/// Map an invalid request candidate to its error response.
///
/// Checks run in order; the first matching rule wins:
///
/// 1. not a keyed object, or `id` key present with a disallowed type
///    → -32600 with id forced to null
/// 2. wrong/missing `jsonrpc`, or invalid `method` → -32600, id copied
/// 3. `params` present but not array/object → -32602, id copied
/// 4. extra keys beyond {jsonrpc, method, params, id} → -32600, id copied
/// 5. fallback (unreachable when 1-4 are exhaustive) → -32603, id copied
pub fn handle_invalid_request(candidate: &Value) -> Response {
    let Some(obj) = candidate.as_object() else {
        return Response::error(ErrorData::invalid_request(), Id::Null);
    };
    if let Some(id) = obj.get("id") {
        if !id_is_valid(id) {
            return Response::error(ErrorData::invalid_request(), Id::Null);
        }
    }

    let id = copied_id(candidate);
    if !version_is_valid(obj.get("jsonrpc")) || !method_is_valid(obj.get("method")) {
        return Response::error(ErrorData::invalid_request(), id);
    }
    if let Some(params) = obj.get("params") {
        if !params_is_valid(params) {
            return Response::error(ErrorData::invalid_params(), id);
        }
    }
    if !obj.keys().all(|k| REQUEST_KEYS.contains(&k.as_str())) {
        return Response::error(ErrorData::invalid_request(), id);
    }

    Response::error(ErrorData::internal_error(), id)
}
