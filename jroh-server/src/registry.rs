//! Method registry: name → handler-chain mapping
//!
//! Registration happens at startup; lookups happen on every dispatched
//! item. The map lives behind an `Arc` so cloning a registry for a spawned
//! task is a pointer bump, while registration uses copy-on-write semantics
//! via `Arc::make_mut`.

use crate::handler::{from_typed_fn, HandlerChain, Step};
use jroh_core::codec::Payload;
use jroh_core::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Method names starting with this prefix are reserved for protocol
/// extensions and cannot be registered.
pub const RESERVED_PREFIX: &str = "rpc.";

/// Maps method names to their handler chains.
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    handlers: Arc<HashMap<String, HandlerChain>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler chain under a method name.
    ///
    /// The name must be non-blank after trimming and must not start with the
    /// reserved `rpc.` prefix. Registering an already-registered name
    /// replaces the previous chain.
    pub fn register(
        &mut self,
        method: impl Into<String>,
        steps: Vec<Box<dyn Step>>,
    ) -> Result<()> {
        let method = method.into();
        if method.trim().is_empty() {
            return Err(Error::InvalidMethodName(
                "method name must be non-empty".to_string(),
            ));
        }
        if method.starts_with(RESERVED_PREFIX) {
            return Err(Error::InvalidMethodName(format!(
                "method name '{}' uses the reserved 'rpc.' prefix",
                method
            )));
        }
        debug!(method = %method, steps = steps.len(), "registering method");
        Arc::make_mut(&mut self.handlers).insert(method, HandlerChain::new(steps));
        Ok(())
    }

    /// Register a typed async function as a single-step chain.
    pub fn register_fn<F, Fut, P, R>(&mut self, method: impl Into<String>, f: F) -> Result<()>
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        P: DeserializeOwned + Send + Sync + 'static,
        R: Serialize + Send + Sync + 'static,
    {
        self.register(method, vec![from_typed_fn(f)])
    }

    /// Look up the chain for a method name.
    pub fn get(&self, method: &str) -> Option<&HandlerChain> {
        self.handlers.get(method)
    }

    /// Whether a method name is registered.
    pub fn has(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// All registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Whether this registry can make progress on the payload: true when
    /// every item that *names* a method names a registered one.
    ///
    /// Items that are not objects, lack a `method` key, or carry a
    /// non-string method don't block - the validator owns those, and they
    /// resolve in any pass.
    pub fn handlers_present(&self, payload: &Payload) -> bool {
        payload.items().iter().all(|item| {
            match item.get("method").and_then(|m| m.as_str()) {
                Some(method) => self.has(method),
                None => true,
            }
        })
    }
}
