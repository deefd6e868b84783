//! JSON-RPC 2.0 dispatch engine for HTTP request/response cycles
//!
//! This crate turns one HTTP request body into one HTTP response shape,
//! speaking JSON-RPC 2.0 in between. The pieces:
//!
//! - [`MethodRegistry`]: method name → [`HandlerChain`] mapping
//! - [`Envelope`] / [`CallContext`]: per-item request/response state handed
//!   to handler steps
//! - [`Dispatcher`]: validates, executes (parallel or sequential) and merges
//!   a payload into a [`DispatchOutcome`]
//! - [`DispatchPipeline`]: several dispatchers chained over one payload,
//!   with deferred items flowing between stages
//!
//! # Example
//!
//! ```rust
//! use jroh_server::{Dispatcher, MethodRegistry};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut registry = MethodRegistry::new();
//! registry
//!     .register_fn("subtract", |params: (i64, i64)| async move {
//!         Ok(params.0 - params.1)
//!     })
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(registry);
//! let outcome = dispatcher
//!     .dispatch(Some(json!(
//!         {"jsonrpc": "2.0", "method": "subtract", "params": [42, 23], "id": 1}
//!     )))
//!     .await;
//! assert_eq!(
//!     outcome.body,
//!     Some(json!({"jsonrpc": "2.0", "result": 19, "id": 1}))
//! );
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod handler;
pub mod registry;

pub use config::{error_hook, BodyParser, DispatcherConfig, ErrorHook, JsonBodyParser};
pub use dispatcher::{ContentType, DispatchOutcome, DispatchPipeline, Dispatcher};
pub use envelope::Envelope;
pub use handler::{from_fn, from_typed_fn, CallContext, HandlerChain, SharedState, Step, StepFlow};
pub use registry::{MethodRegistry, RESERVED_PREFIX};
