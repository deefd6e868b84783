//! JROH - JSON-RPC 2.0 Over HTTP dispatch
//!
//! This is the main convenience crate that re-exports the JROH sub-crates.
//! Use this crate if you want a single dependency covering both the protocol
//! types and the dispatch engine.
//!
//! # Architecture
//!
//! JROH is organized into modular crates:
//!
//! - **jroh-core**: Wire types, request/response validation, error-code
//!   registry, payload codec
//! - **jroh-server**: Method registry, handler chains, the dispatcher and
//!   multi-registry pipelines
//!
//! # Quick Start
//!
//! ```rust
//! use jroh::{Dispatcher, MethodRegistry};
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct AddParams(i32, i32);
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut registry = MethodRegistry::new();
//! registry
//!     .register_fn("add", |p: AddParams| async move { Ok(p.0 + p.1) })
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(registry);
//! let outcome = dispatcher
//!     .dispatch(Some(json!(
//!         {"jsonrpc": "2.0", "method": "add", "params": [5, 3], "id": 1}
//!     )))
//!     .await;
//! assert_eq!(outcome.body.unwrap()["result"], json!(8));
//! # }
//! ```

// Re-export all public APIs from sub-crates
// This allows users to access everything through `jroh::` prefix
pub use jroh_core as core;
pub use jroh_server as server;

// Convenience re-exports of the most commonly used types
pub use jroh_core::{Error, ErrorData, Id, Request, Response, Result};
pub use jroh_server::{
    CallContext, DispatchOutcome, DispatchPipeline, Dispatcher, DispatcherConfig, MethodRegistry,
    StepFlow,
};
