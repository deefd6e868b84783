//! Handler steps, call contexts and handler chains
//!
//! A method is served by a [`HandlerChain`]: an ordered sequence of
//! [`Step`]s. Each step receives a [`CallContext`] and returns a
//! [`StepFlow`] telling the chain whether to keep going. This mirrors a
//! middleware pipeline: early steps can authenticate or enrich shared
//! metadata and `Continue`, the final step writes the result and `Halt`s.
//!
//! The context clones cheaply and is safe to move into spawned tasks: the
//! envelope sits behind an async mutex that is only ever locked for the
//! duration of one accessor call, never across a user await point.

use crate::envelope::Envelope;
use async_trait::async_trait;
use jroh_core::error::{Error, ErrorData, Result};
use jroh_core::types::Id;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared per-payload metadata, visible to every item in the same dispatch.
pub type SharedState = Arc<Mutex<HashMap<String, Value>>>;

/// What a step tells the chain to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFlow {
    /// Run the next step in the chain
    Continue,
    /// Stop the chain; the envelope holds the outcome
    Halt,
}

/// One unit of work in a handler chain.
#[async_trait]
pub trait Step: Send + Sync {
    async fn call(&self, ctx: CallContext) -> Result<StepFlow>;
}

/// Handle to one batch item's envelope plus the payload-wide shared state.
///
/// Every accessor takes the envelope lock internally and releases it before
/// returning, so steps can hold a `CallContext` across their own awaits
/// freely.
#[derive(Clone)]
pub struct CallContext {
    envelope: Arc<Mutex<Envelope>>,
    shared: SharedState,
}

impl CallContext {
    pub fn new(envelope: Envelope, shared: SharedState) -> Self {
        Self {
            envelope: Arc::new(Mutex::new(envelope)),
            shared,
        }
    }

    /// The wrapped candidate request.
    pub async fn request(&self) -> Option<Value> {
        self.envelope.lock().await.request().cloned()
    }

    /// The request's `params` member, if any.
    pub async fn params(&self) -> Option<Value> {
        self.envelope
            .lock()
            .await
            .request()
            .and_then(|req| req.get("params"))
            .cloned()
    }

    /// The effective request/response id.
    pub async fn id(&self) -> Option<Id> {
        self.envelope.lock().await.id()
    }

    /// Whether this item is a notification.
    pub async fn is_notification(&self) -> bool {
        self.envelope.lock().await.is_notification()
    }

    /// Write the result (clearing any error). See [`Envelope::set_result`].
    pub async fn set_result(&self, result: Option<Value>) {
        self.envelope.lock().await.set_result(result);
    }

    /// Write an error object (clearing any result).
    pub async fn set_error(&self, error: Option<ErrorData>) {
        self.envelope.lock().await.set_error(error);
    }

    /// Signal bad parameters on this item.
    pub async fn invalid_params(&self, data: Option<Value>) {
        self.envelope.lock().await.invalid_params(data);
    }

    /// Signal a server-side failure on this item.
    pub async fn server_error(&self, code: Option<i64>, data: Option<Value>) {
        self.envelope.lock().await.server_error(code, data);
    }

    /// Store a value in the payload-wide shared state.
    pub async fn insert_metadata(&self, key: impl Into<String>, value: Value) {
        self.shared.lock().await.insert(key.into(), value);
    }

    /// Read a value from the payload-wide shared state.
    pub async fn get_metadata(&self, key: &str) -> Option<Value> {
        self.shared.lock().await.get(key).cloned()
    }

    /// Derive this item's final response. Used by the dispatcher once the
    /// chain has settled.
    pub async fn response(&self) -> Option<Value> {
        self.envelope.lock().await.response()
    }

    /// Run a closure against the locked envelope, for accessors without a
    /// dedicated context method.
    pub async fn with_envelope<R>(&self, f: impl FnOnce(&mut Envelope) -> R) -> R {
        let mut envelope = self.envelope.lock().await;
        f(&mut envelope)
    }
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext").finish_non_exhaustive()
    }
}

struct FnStep<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Step for FnStep<F>
where
    F: Fn(CallContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<StepFlow>> + Send,
{
    async fn call(&self, ctx: CallContext) -> Result<StepFlow> {
        (self.f)(ctx).await
    }
}

/// Wrap an async closure as a [`Step`].
pub fn from_fn<F, Fut>(f: F) -> Box<dyn Step>
where
    F: Fn(CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StepFlow>> + Send + 'static,
{
    Box::new(FnStep { f })
}

struct TypedFnStep<F, P, R> {
    f: F,
    _marker: std::marker::PhantomData<fn(P) -> R>,
}

#[async_trait]
impl<F, Fut, P, R> Step for TypedFnStep<F, P, R>
where
    F: Fn(P) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R>> + Send,
    P: DeserializeOwned + Send + Sync,
    R: Serialize + Send + Sync,
{
    async fn call(&self, ctx: CallContext) -> Result<StepFlow> {
        let params = ctx.params().await.unwrap_or(Value::Null);
        let params: P = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                ctx.invalid_params(Some(Value::String(e.to_string()))).await;
                return Ok(StepFlow::Halt);
            }
        };
        let result = (self.f)(params).await?;
        let result =
            serde_json::to_value(result).map_err(|e| Error::Serialization(e.to_string()))?;
        ctx.set_result(Some(result)).await;
        Ok(StepFlow::Halt)
    }
}

/// Wrap a typed async function as a terminal [`Step`].
///
/// Params are deserialized from the request's `params` member (absent params
/// deserialize from JSON null); a deserialize failure becomes an
/// Invalid-params error on the item rather than a chain failure.
pub fn from_typed_fn<F, Fut, P, R>(f: F) -> Box<dyn Step>
where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
    P: DeserializeOwned + Send + Sync + 'static,
    R: Serialize + Send + Sync + 'static,
{
    Box::new(TypedFnStep {
        f,
        _marker: std::marker::PhantomData,
    })
}

/// An ordered sequence of steps serving one method.
#[derive(Clone)]
pub struct HandlerChain {
    steps: Vec<Arc<dyn Step>>,
}

impl HandlerChain {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self {
            steps: steps.into_iter().map(Arc::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the chain to completion: steps execute in order until one halts
    /// or fails. A chain that runs out of steps without halting simply ends;
    /// whatever the envelope holds at that point stands.
    pub async fn run(&self, ctx: CallContext) -> Result<()> {
        for step in &self.steps {
            match step.call(ctx.clone()).await? {
                StepFlow::Continue => continue,
                StepFlow::Halt => break,
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerChain")
            .field("steps", &self.steps.len())
            .finish()
    }
}
