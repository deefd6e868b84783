//! Dispatcher configuration: execution mode, error hook, body parsing
//!
//! Configuration follows a fluent builder pattern; the defaults (parallel
//! execution, strict JSON body parsing, no error hook) cover the common
//! case, so `DispatcherConfig::default()` is a working configuration.

use crate::handler::CallContext;
use async_trait::async_trait;
use jroh_core::error::{Error, Result};
use serde_json::Value;
use std::sync::Arc;

/// Observes handler-chain failures before the default error mapping runs.
///
/// The hook may write its own error onto the item through the context; if it
/// leaves the item without a coherent response (or fails itself), the
/// dispatcher's fallback mapping still applies.
#[async_trait]
pub trait ErrorHook: Send + Sync {
    async fn handle(&self, error: &Error, ctx: &CallContext) -> Result<()>;
}

struct FnErrorHook<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> ErrorHook for FnErrorHook<F>
where
    F: Fn(Error, CallContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<()>> + Send,
{
    async fn handle(&self, error: &Error, ctx: &CallContext) -> Result<()> {
        (self.f)(error.clone(), ctx.clone()).await
    }
}

/// Wrap an async closure as an [`ErrorHook`].
pub fn error_hook<F, Fut>(f: F) -> Arc<dyn ErrorHook>
where
    F: Fn(Error, CallContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnErrorHook { f })
}

/// Turns a raw request body into a JSON value; `None` means unparseable,
/// which the dispatcher maps to a Parse-error response.
pub trait BodyParser: Send + Sync {
    fn parse(&self, raw: &[u8]) -> Option<Value>;
}

/// Strict JSON body parser; any syntax error yields `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBodyParser;

impl BodyParser for JsonBodyParser {
    fn parse(&self, raw: &[u8]) -> Option<Value> {
        serde_json::from_slice(raw).ok()
    }
}

/// Tunables for one dispatcher instance.
#[derive(Clone)]
pub struct DispatcherConfig {
    base_path: Option<String>,
    parallel: bool,
    on_error: Option<Arc<dyn ErrorHook>>,
    body_parser: Option<Arc<dyn BodyParser>>,
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the dispatcher to requests on this URL path. Path matching
    /// is the mounting layer's job; the value is carried for it to consult.
    pub fn base_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Execute batch items concurrently (the default) or strictly in order.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Install a hook that observes handler-chain failures.
    pub fn on_error(mut self, hook: Arc<dyn ErrorHook>) -> Self {
        self.on_error = Some(hook);
        self
    }

    /// Replace the body parser used by `dispatch_raw`.
    pub fn body_parser(mut self, parser: Arc<dyn BodyParser>) -> Self {
        self.body_parser = Some(parser);
        self
    }

    pub fn base_path_ref(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn error_hook(&self) -> Option<&Arc<dyn ErrorHook>> {
        self.on_error.as_ref()
    }

    pub fn parse_body(&self, raw: &[u8]) -> Option<Value> {
        match &self.body_parser {
            Some(parser) => parser.parse(raw),
            None => JsonBodyParser.parse(raw),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            base_path: None,
            parallel: true,
            on_error: None,
            body_parser: None,
        }
    }
}

impl std::fmt::Debug for DispatcherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherConfig")
            .field("base_path", &self.base_path)
            .field("parallel", &self.parallel)
            .field("on_error", &self.on_error.is_some())
            .field("body_parser", &self.body_parser.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = DispatcherConfig::default();
        assert!(config.is_parallel());
        assert!(config.base_path_ref().is_none());
        assert!(config.error_hook().is_none());
    }

    #[test]
    fn test_builder() {
        let config = DispatcherConfig::new().base_path("/rpc").parallel(false);
        assert_eq!(config.base_path_ref(), Some("/rpc"));
        assert!(!config.is_parallel());
    }

    #[test]
    fn test_default_body_parser() {
        let config = DispatcherConfig::default();
        assert_eq!(
            config.parse_body(br#"{"jsonrpc":"2.0"}"#),
            Some(json!({"jsonrpc": "2.0"}))
        );
        assert_eq!(config.parse_body(b"not json"), None);
    }

    #[test]
    fn test_custom_body_parser() {
        struct UppercaseRejecter;
        impl BodyParser for UppercaseRejecter {
            fn parse(&self, raw: &[u8]) -> Option<Value> {
                if raw.iter().any(u8::is_ascii_uppercase) {
                    return None;
                }
                serde_json::from_slice(raw).ok()
            }
        }

        let config = DispatcherConfig::new().body_parser(Arc::new(UppercaseRejecter));
        assert_eq!(config.parse_body(br#"{"a":1}"#), Some(json!({"a": 1})));
        assert_eq!(config.parse_body(br#"{"A":1}"#), None);
    }
}
