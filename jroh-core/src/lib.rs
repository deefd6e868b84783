//! Core JSON-RPC 2.0 types, validation and codec for jroh
//!
//! This crate provides the protocol foundation for the jroh dispatch engine:
//!
//! - **Types**: wire-level data structures (requests, responses, error objects)
//! - **Validation**: pure grammar checks over raw JSON candidates, plus the
//!   deterministic invalid-request → error-response mapping
//! - **Codec**: payload classification (single vs batch) and encode helpers
//! - **Errors**: the application error enum and the immutable registry of
//!   reserved protocol error codes
//!
//! # Architecture
//!
//! The crate is transport-agnostic: it knows nothing about HTTP or sockets.
//! The `jroh-server` crate builds the envelope/registry/dispatcher machinery
//! on top of this foundation, and an HTTP layer is expected to hand in
//! already-parsed payloads and carry out the resulting body/content-type.
//!
//! Validation deliberately works on raw `serde_json::Value`s rather than the
//! typed structs: incoming batch items can be arbitrarily malformed, and each
//! one must be classified independently without failing the whole payload.
//!
//! # Example
//!
//! ```rust
//! use jroh_core::{validate, Request, Id, codec};
//! use serde_json::json;
//!
//! let candidate = json!({"jsonrpc": "2.0", "method": "subtract", "params": [42, 23], "id": 1});
//! assert!(validate::request_is_valid(&candidate));
//!
//! let request = Request::call("subtract", Some(json!([42, 23])), Id::Number(1));
//! let encoded = codec::encode(&request).unwrap();
//! assert!(encoded.contains("\"method\":\"subtract\""));
//! ```

pub mod codec;
pub mod error;
pub mod types;
pub mod validate;

// Re-export the most commonly used items for convenience
pub use codec::Payload;
pub use error::{
    canonical_message, code_registry, is_reserved_code, Error, ErrorData, Result,
    SERVER_ERROR_MAX, SERVER_ERROR_MIN,
};
pub use types::{Id, Request, Response};
