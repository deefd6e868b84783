//! Error types for jroh
//!
//! Two error types live here:
//!
//! - **Error**: application-level errors for internal use (uses thiserror)
//! - **ErrorData**: wire-format error objects as defined by JSON-RPC 2.0
//!
//! # Spec-Compliant Error Codes
//!
//! JSON-RPC 2.0 reserves these codes:
//! - `-32700`: Parse error (payload not parseable upstream)
//! - `-32600`: Invalid Request (structurally non-conformant request)
//! - `-32601`: Method not found
//! - `-32602`: Invalid params
//! - `-32603`: Internal error
//! - `-32000..=-32099`: Server error (implementation-defined failures)
//!
//! The full set is held in a process-wide immutable registry, built once and
//! read-only thereafter; response validation checks error codes against it.
//!
//! # Canonical Messages
//!
//! The factory methods on [`ErrorData`] emit the canonical message strings
//! ("Invalid Request", "Method not found", ...). Anything more specific
//! belongs in the `data` member, never appended to `message`: clients match
//! on the canonical strings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Result type for jroh operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lower bound of the reserved server-error range (inclusive).
pub const SERVER_ERROR_MIN: i64 = -32099;
/// Upper bound of the reserved server-error range (inclusive).
pub const SERVER_ERROR_MAX: i64 = -32000;

static CODE_REGISTRY: OnceLock<HashMap<i64, &'static str>> = OnceLock::new();

/// The process-wide registry of reserved error codes.
///
/// Five standard codes plus the 100-entry server-error range. Built on first
/// access and immutable afterwards.
pub fn code_registry() -> &'static HashMap<i64, &'static str> {
    CODE_REGISTRY.get_or_init(|| {
        let mut table = HashMap::new();
        table.insert(-32700, "Parse error");
        table.insert(-32600, "Invalid Request");
        table.insert(-32601, "Method not found");
        table.insert(-32602, "Invalid params");
        table.insert(-32603, "Internal error");
        for code in SERVER_ERROR_MIN..=SERVER_ERROR_MAX {
            table.insert(code, "Server error");
        }
        table
    })
}

/// Whether `code` is one of the reserved JSON-RPC error codes.
pub fn is_reserved_code(code: i64) -> bool {
    code_registry().contains_key(&code)
}

/// The canonical message for a reserved code, if the code is recognized.
pub fn canonical_message(code: i64) -> Option<&'static str> {
    code_registry().get(&code).copied()
}

/// Application-level error type for jroh operations
///
/// All protocol-level conditions are recovered inside the dispatch layer and
/// surfaced as structured [`ErrorData`] response entries. The one category
/// that fails loudly is [`Error::InvalidMethodName`], raised synchronously at
/// registration time: a bad method name is a programming error at setup, not
/// a runtime request condition.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// JSON-RPC protocol error, already in wire format
    ///
    /// A handler returning this variant gets the exact error object set on
    /// its response instead of the generic server-error fallback.
    #[error("JSON-RPC error: {0}")]
    JsonRpc(#[from] ErrorData),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The request is not well-formed according to the JSON-RPC 2.0 grammar
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The requested method name is not in the registry (-32601)
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// The method exists but the parameters are unusable (-32602)
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Unexpected failure during request processing (-32603)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Rejected at registration time: empty name or reserved "rpc." prefix
    #[error("Invalid method name: {0}")]
    InvalidMethodName(String),
}

/// JSON-RPC 2.0 error object as it appears in the `error` member of a response
///
/// Per spec the object MUST contain `code` and `message` and MAY contain
/// `data`. For a response to be spec-valid the code must come from the
/// reserved registry (see [`is_reserved_code`]).
///
/// # Examples
///
/// ```rust
/// use jroh_core::ErrorData;
/// use serde_json::json;
///
/// let err = ErrorData::invalid_params().with_data(json!({"missing": ["minuend"]}));
/// assert_eq!(err.code, -32602);
/// assert_eq!(err.message, "Invalid params");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Numeric error code
    pub code: i64,
    /// Canonical short description of the error
    pub message: String,
    /// Optional additional information (detail strings, validation info, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorData {
    /// Create an error object with an explicit code and message.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach a `data` member.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Parse error (-32700): the payload was not parseable upstream.
    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error")
    }

    /// Invalid Request (-32600): the candidate is not a valid Request object.
    pub fn invalid_request() -> Self {
        Self::new(-32600, "Invalid Request")
    }

    /// Method not found (-32601): well-formed request, unregistered method.
    pub fn method_not_found() -> Self {
        Self::new(-32601, "Method not found")
    }

    /// Invalid params (-32602): `params` fails the shape check, or a handler
    /// explicitly signalled bad params.
    pub fn invalid_params() -> Self {
        Self::new(-32602, "Invalid params")
    }

    /// Internal error (-32603): a response-construction invariant broke.
    pub fn internal_error() -> Self {
        Self::new(-32603, "Internal error")
    }

    /// Server error: the supplied code when given, else -32000.
    ///
    /// The code is not range-checked here; the original accepted any integer
    /// from a failing handler, and spec-compliance of the final response is
    /// the validator's concern.
    pub fn server_error(code: impl Into<Option<i64>>) -> Self {
        Self::new(code.into().unwrap_or(SERVER_ERROR_MAX), "Server error")
    }

    /// Convert this error object into its raw JSON representation.
    pub fn into_value(self) -> Value {
        let mut map = Map::new();
        map.insert("code".to_string(), Value::Number(self.code.into()));
        map.insert("message".to_string(), Value::String(self.message));
        if let Some(data) = self.data {
            map.insert("data".to_string(), data);
        }
        Value::Object(map)
    }
}

impl std::fmt::Display for ErrorData {
    /// Formats as "[code] message" for readability in logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorData {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_standard_codes() {
        assert_eq!(canonical_message(-32700), Some("Parse error"));
        assert_eq!(canonical_message(-32600), Some("Invalid Request"));
        assert_eq!(canonical_message(-32601), Some("Method not found"));
        assert_eq!(canonical_message(-32602), Some("Invalid params"));
        assert_eq!(canonical_message(-32603), Some("Internal error"));
    }

    #[test]
    fn test_registry_server_error_range() {
        assert_eq!(canonical_message(-32000), Some("Server error"));
        assert_eq!(canonical_message(-32050), Some("Server error"));
        assert_eq!(canonical_message(-32099), Some("Server error"));
        // 105 entries: 5 standard + 100 reserved server errors
        assert_eq!(code_registry().len(), 105);
    }

    #[test]
    fn test_registry_rejects_outside_codes() {
        assert!(!is_reserved_code(0));
        assert!(!is_reserved_code(-32100));
        assert!(!is_reserved_code(-31999));
        assert!(!is_reserved_code(-32768));
    }

    #[test]
    fn test_factory_codes_and_messages() {
        let cases = [
            (ErrorData::parse_error(), -32700, "Parse error"),
            (ErrorData::invalid_request(), -32600, "Invalid Request"),
            (ErrorData::method_not_found(), -32601, "Method not found"),
            (ErrorData::invalid_params(), -32602, "Invalid params"),
            (ErrorData::internal_error(), -32603, "Internal error"),
        ];
        for (error, code, message) in cases {
            assert_eq!(error.code, code);
            assert_eq!(error.message, message);
            assert!(error.data.is_none());
        }
    }

    #[test]
    fn test_server_error_default_code() {
        assert_eq!(ErrorData::server_error(None).code, -32000);
        assert_eq!(ErrorData::server_error(-32042).code, -32042);
        assert_eq!(ErrorData::server_error(None).message, "Server error");
    }

    #[test]
    fn test_error_data_serialization() {
        let error = ErrorData::invalid_params().with_data(json!({"missing": ["a"]}));
        let encoded = serde_json::to_value(&error).unwrap();
        assert_eq!(
            encoded,
            json!({"code": -32602, "message": "Invalid params", "data": {"missing": ["a"]}})
        );

        // data is skipped entirely when absent
        let encoded = serde_json::to_value(ErrorData::invalid_request()).unwrap();
        assert_eq!(encoded, json!({"code": -32600, "message": "Invalid Request"}));
    }

    #[test]
    fn test_error_display() {
        let error = ErrorData::method_not_found();
        let display = format!("{}", error);
        assert!(display.contains("-32601"));
        assert!(display.contains("Method not found"));
    }

    #[test]
    fn test_error_from_error_data() {
        let error: Error = ErrorData::invalid_params().into();
        match error {
            Error::JsonRpc(data) => assert_eq!(data.code, -32602),
            _ => panic!("Expected JsonRpc error"),
        }
    }
}
