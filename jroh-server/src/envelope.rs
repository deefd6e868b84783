//! Per-request envelope: mutable request/response state for one batch item
//!
//! An [`Envelope`] wraps exactly one candidate request for the duration of
//! one dispatch cycle. It owns the item's response slot - handlers write
//! results and errors through it, and the dispatcher reads the derived
//! response out of it when the item settles. Each envelope is exclusively
//! owned by one item's execution; concurrent batch items can never touch each
//! other's envelope.
//!
//! # Lazy response derivation
//!
//! The response is *derived* on read, not stored eagerly:
//!
//! - a notification (request with no `id` key) always derives to no response,
//!   even if a handler explicitly set an error;
//! - an invalid request derives to the validator's fixed error mapping;
//! - an explicitly written, spec-valid response is returned as-is;
//! - anything else (e.g. a handler that ran but never wrote a result) falls
//!   back to an Internal-Error response carrying the request's id.
//!
//! # Mutation rules
//!
//! The response slot is kept as a raw JSON value so that intermediate states
//! (error object under construction, half-written response) are
//! representable; validity is only enforced at read time. Setting `result`
//! removes `error` and vice versa, preserving the "exactly one of
//! result/error" invariant for the final object. Setting an error `code`
//! auto-fills `message` from the reserved-code registry so callers never
//! have to restate canonical messages.

use jroh_core::error::{canonical_message, ErrorData};
use jroh_core::types::{Id, Request};
use jroh_core::validate::{
    handle_invalid_request, is_notification, request_is_valid, response_is_valid,
};
use serde_json::{json, Map, Value};

/// Per-request mutable wrapper holding request/response state and derived
/// accessors. See the module docs for the derivation rules.
#[derive(Debug, Clone)]
pub struct Envelope {
    request: Option<Value>,
    response: Value,
    valid: bool,
    notification: bool,
}

impl Envelope {
    /// Create an envelope with no request attached.
    pub fn new() -> Self {
        Self {
            request: None,
            response: json!({"jsonrpc": "2.0", "id": null}),
            valid: false,
            notification: false,
        }
    }

    /// Create an envelope wrapping one candidate request.
    pub fn from_request(request: Value) -> Self {
        let mut envelope = Self::new();
        envelope.set_request(request);
        envelope
    }

    /// The wrapped candidate request.
    pub fn request(&self) -> Option<&Value> {
        self.request.as_ref()
    }

    /// The request parsed into its typed form, when it is valid.
    pub fn typed_request(&self) -> Option<Request> {
        if !self.valid {
            return None;
        }
        self.request
            .as_ref()
            .and_then(|req| serde_json::from_value(req.clone()).ok())
    }

    /// Replace the wrapped request, recomputing validity and notification
    /// state and re-deriving the default response id.
    pub fn set_request(&mut self, request: Value) {
        self.valid = request_is_valid(&request);
        // Invalid candidates are never treated as notifications: they must
        // produce an error entry even when the id key is absent.
        self.notification = self.valid && is_notification(&request);
        if self.valid {
            if let Some(id) = request.get("id") {
                if !id.is_null() {
                    self.set_id_value(id.clone());
                }
            }
        }
        self.request = Some(request);
    }

    /// Whether the wrapped request passed validation.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether the wrapped request is a notification.
    pub fn is_notification(&self) -> bool {
        self.notification
    }

    /// Derive the response for this item, applying the rules from the module
    /// docs. `None` means "no response entry" (notifications).
    pub fn response(&self) -> Option<Value> {
        if self.notification {
            return None;
        }
        if let Some(request) = &self.request {
            if !self.valid {
                return Some(handle_invalid_request(request).into_value());
            }
        }
        if response_is_valid(&self.response) {
            return Some(self.response.clone());
        }
        // Handler ran without producing a coherent response: internal error,
        // keeping the request id when one is available.
        let id = self
            .request
            .as_ref()
            .and_then(|req| req.get("id"))
            .filter(|id| !id.is_null())
            .and_then(Id::from_value)
            .unwrap_or(Id::Null);
        Some(jroh_core::Response::error(ErrorData::internal_error(), id).into_value())
    }

    /// Overwrite the raw response slot wholesale.
    ///
    /// The value is not validated here; an incoherent response falls back to
    /// Internal error at read time.
    pub fn set_response(&mut self, response: Value) {
        self.response = response;
    }

    fn ensure_object(&mut self) -> &mut Map<String, Value> {
        if !self.response.is_object() {
            self.response = Value::Object(Map::new());
        }
        match &mut self.response {
            Value::Object(map) => map,
            _ => unreachable!("response was just made an object"),
        }
    }

    fn ensure_error_object(&mut self) -> &mut Map<String, Value> {
        let obj = self.ensure_object();
        let needs_reset = !obj.get("error").map(Value::is_object).unwrap_or(false);
        if needs_reset {
            obj.insert("error".to_string(), Value::Object(Map::new()));
        }
        match obj.get_mut("error") {
            Some(Value::Object(map)) => map,
            _ => unreachable!("error was just made an object"),
        }
    }

    /// The current `result` value, if one is set.
    pub fn result(&self) -> Option<&Value> {
        self.response.get("result")
    }

    /// Set or clear the `result`. `Some` also removes any `error` (the two
    /// are mutually exclusive); `None` removes the key rather than storing a
    /// null placeholder. `Some(Value::Null)` stores a genuine null result.
    pub fn set_result(&mut self, result: Option<Value>) {
        let obj = self.ensure_object();
        match result {
            Some(value) => {
                obj.insert("result".to_string(), value);
                obj.remove("error");
            }
            None => {
                obj.remove("result");
            }
        }
    }

    /// The current error object, if one is set.
    pub fn error(&self) -> Option<&Value> {
        self.response.get("error")
    }

    /// Set or clear the error. `Some` also removes any `result`; `None`
    /// removes the error key.
    pub fn set_error(&mut self, error: Option<ErrorData>) {
        let obj = self.ensure_object();
        match error {
            Some(data) => {
                obj.insert("error".to_string(), data.into_value());
                obj.remove("result");
            }
            None => {
                obj.remove("error");
            }
        }
    }

    /// The current error code.
    pub fn code(&self) -> Option<i64> {
        self.response.get("error")?.get("code")?.as_i64()
    }

    /// Set the error code, auto-filling `message` from the reserved-code
    /// registry when the code is recognized.
    pub fn set_code(&mut self, code: i64) {
        let message = canonical_message(code);
        let err = self.ensure_error_object();
        err.insert("code".to_string(), Value::Number(code.into()));
        if let Some(message) = message {
            err.insert("message".to_string(), Value::String(message.to_string()));
        }
    }

    /// The current error message.
    pub fn message(&self) -> Option<&str> {
        self.response.get("error")?.get("message")?.as_str()
    }

    /// Set the error message directly.
    pub fn set_message(&mut self, message: impl Into<String>) {
        let err = self.ensure_error_object();
        err.insert("message".to_string(), Value::String(message.into()));
    }

    /// The current auxiliary error `data`.
    pub fn data(&self) -> Option<&Value> {
        self.response.get("error")?.get("data")
    }

    /// Set or remove the auxiliary error `data`. `None` and `Some(Null)`
    /// both remove the key.
    pub fn set_data(&mut self, data: Option<Value>) {
        let err = self.ensure_error_object();
        match data {
            Some(value) if !value.is_null() => {
                err.insert("data".to_string(), value);
            }
            _ => {
                err.remove("data");
            }
        }
    }

    /// The effective id: the response's own id when set and non-null, else
    /// the request's id when present and non-null.
    pub fn id(&self) -> Option<Id> {
        if let Some(id) = self.response.get("id") {
            if !id.is_null() {
                return Id::from_value(id);
            }
        }
        self.request
            .as_ref()
            .and_then(|req| req.get("id"))
            .filter(|id| !id.is_null())
            .and_then(Id::from_value)
    }

    /// Set the response id.
    pub fn set_id(&mut self, id: Id) {
        self.set_id_value(id.into_value());
    }

    fn set_id_value(&mut self, id: Value) {
        let obj = self.ensure_object();
        obj.insert("id".to_string(), id);
    }

    /// Signal bad parameters: error -32602 "Invalid params", result cleared.
    /// Existing auxiliary `data` survives unless `data` supplies a new value.
    pub fn invalid_params(&mut self, data: Option<Value>) {
        let previous = self.data().cloned();
        self.set_error(Some(ErrorData::invalid_params()));
        self.set_result(None);
        if let Some(previous) = previous {
            self.set_data(Some(previous));
        }
        if let Some(data) = data {
            self.set_data(Some(data));
        }
    }

    /// Signal a server-side failure: the supplied code when given (else
    /// -32000), message "Server error", result cleared. `data` handling as
    /// in [`invalid_params`](Envelope::invalid_params).
    pub fn server_error(&mut self, code: Option<i64>, data: Option<Value>) {
        let previous = self.data().cloned();
        self.set_error(Some(ErrorData::server_error(code)));
        self.set_result(None);
        if let Some(previous) = previous {
            self.set_data(Some(previous));
        }
        if let Some(data) = data {
            self.set_data(Some(data));
        }
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_request_response_roundtrip() {
        let mut envelope = Envelope::from_request(
            json!({"jsonrpc": "2.0", "method": "subtract", "params": [42, 23], "id": 1}),
        );
        assert!(envelope.is_valid());
        assert!(!envelope.is_notification());

        envelope.set_result(Some(json!(19)));
        assert_eq!(
            envelope.response(),
            Some(json!({"jsonrpc": "2.0", "result": 19, "id": 1}))
        );
    }

    #[test]
    fn test_invalid_request_derives_validator_mapping() {
        let envelope = Envelope::from_request(json!({"foo": "boo"}));
        assert!(!envelope.is_valid());
        assert_eq!(
            envelope.response(),
            Some(json!({
                "jsonrpc": "2.0",
                "error": {"code": -32600, "message": "Invalid Request"},
                "id": null
            }))
        );
    }

    #[test]
    fn test_invalid_request_without_id_is_not_a_notification() {
        // the id key is absent but the request is invalid, so it still
        // produces an error entry
        let envelope = Envelope::from_request(json!({"jsonrpc": "2.0"}));
        assert!(!envelope.is_notification());
        assert!(envelope.response().is_some());
    }

    #[test]
    fn test_notification_always_silent() {
        let mut envelope =
            Envelope::from_request(json!({"jsonrpc": "2.0", "method": "update", "params": [1]}));
        assert!(envelope.is_notification());
        assert_eq!(envelope.response(), None);

        // even an explicitly set error stays silent at the protocol boundary
        envelope.set_error(Some(ErrorData::server_error(None)));
        assert_eq!(envelope.response(), None);
    }

    #[test]
    fn test_unwritten_response_falls_back_to_internal_error() {
        let envelope =
            Envelope::from_request(json!({"jsonrpc": "2.0", "method": "noop", "id": 3}));
        assert_eq!(
            envelope.response(),
            Some(json!({
                "jsonrpc": "2.0",
                "error": {"code": -32603, "message": "Internal error"},
                "id": 3
            }))
        );
    }

    #[test]
    fn test_result_and_error_mutually_exclusive() {
        let mut envelope =
            Envelope::from_request(json!({"jsonrpc": "2.0", "method": "m", "id": 1}));
        envelope.set_result(Some(json!(5)));
        envelope.set_error(Some(ErrorData::invalid_params()));
        assert!(envelope.result().is_none());
        assert!(envelope.error().is_some());

        envelope.set_result(Some(json!(6)));
        assert!(envelope.error().is_none());
        assert_eq!(envelope.result(), Some(&json!(6)));
    }

    #[test]
    fn test_clearing_removes_key_instead_of_null() {
        let mut envelope =
            Envelope::from_request(json!({"jsonrpc": "2.0", "method": "m", "id": 1}));
        envelope.set_result(Some(json!(5)));
        envelope.set_result(None);
        assert!(envelope.result().is_none());
        // neither result nor error set now: read falls back to internal error
        let response = envelope.response().unwrap();
        assert_eq!(response["error"]["code"], json!(-32603));
    }

    #[test]
    fn test_null_result_is_a_real_result() {
        let mut envelope =
            Envelope::from_request(json!({"jsonrpc": "2.0", "method": "m", "id": 1}));
        envelope.set_result(Some(Value::Null));
        assert_eq!(
            envelope.response(),
            Some(json!({"jsonrpc": "2.0", "result": null, "id": 1}))
        );
    }

    #[test]
    fn test_set_code_autofills_message() {
        let mut envelope =
            Envelope::from_request(json!({"jsonrpc": "2.0", "method": "m", "id": 1}));
        envelope.set_code(-32601);
        assert_eq!(envelope.message(), Some("Method not found"));
        envelope.set_code(-32050);
        assert_eq!(envelope.message(), Some("Server error"));

        // unrecognized codes leave the message alone
        envelope.set_message("custom");
        envelope.set_code(-1);
        assert_eq!(envelope.message(), Some("custom"));
        assert_eq!(envelope.code(), Some(-1));
    }

    #[test]
    fn test_invalid_params_preserves_and_overwrites_data() {
        let mut envelope =
            Envelope::from_request(json!({"jsonrpc": "2.0", "method": "m", "id": 1}));
        envelope.set_data(Some(json!("earlier detail")));
        envelope.invalid_params(None);
        assert_eq!(envelope.code(), Some(-32602));
        assert_eq!(envelope.message(), Some("Invalid params"));
        assert_eq!(envelope.data(), Some(&json!("earlier detail")));

        envelope.invalid_params(Some(json!("newer detail")));
        assert_eq!(envelope.data(), Some(&json!("newer detail")));
    }

    #[test]
    fn test_server_error_defaults() {
        let mut envelope =
            Envelope::from_request(json!({"jsonrpc": "2.0", "method": "m", "id": 1}));
        envelope.set_result(Some(json!("partial")));
        envelope.server_error(None, Some(json!("boom")));
        assert!(envelope.result().is_none());
        assert_eq!(envelope.code(), Some(-32000));
        assert_eq!(envelope.message(), Some("Server error"));
        assert_eq!(envelope.data(), Some(&json!("boom")));

        envelope.server_error(Some(-32010), None);
        assert_eq!(envelope.code(), Some(-32010));
        // data from the previous error survives
        assert_eq!(envelope.data(), Some(&json!("boom")));
    }

    #[test]
    fn test_set_request_recomputes_state() {
        let mut envelope = Envelope::from_request(json!({"foo": "boo"}));
        assert!(!envelope.is_valid());

        envelope.set_request(json!({"jsonrpc": "2.0", "method": "m"}));
        assert!(envelope.is_valid());
        assert!(envelope.is_notification());
    }

    #[test]
    fn test_id_prefers_response_then_request() {
        let mut envelope =
            Envelope::from_request(json!({"jsonrpc": "2.0", "method": "m", "id": "req"}));
        assert_eq!(envelope.id(), Some(Id::String("req".into())));
        envelope.set_id(Id::Number(9));
        assert_eq!(envelope.id(), Some(Id::Number(9)));
    }

    #[test]
    fn test_typed_request() {
        let envelope = Envelope::from_request(
            json!({"jsonrpc": "2.0", "method": "sum", "params": [1, 2, 4], "id": "1"}),
        );
        let request = envelope.typed_request().unwrap();
        assert_eq!(request.method, "sum");
        assert_eq!(request.id, Some(Id::String("1".into())));

        let envelope = Envelope::from_request(json!({"foo": "boo"}));
        assert!(envelope.typed_request().is_none());
    }
}
