//! The dispatch engine: one payload in, one HTTP-shaped outcome out
//!
//! A [`Dispatcher`] owns a method registry and a configuration and turns an
//! incoming payload into a [`DispatchOutcome`] (body, content type, status).
//! The engine is HTTP-shaped but transport-free: the mounting layer does the
//! socket work and hands in either raw bytes (`dispatch_raw`) or an
//! already-parsed value (`dispatch`).
//!
//! # Execution model
//!
//! Each payload item gets an indexed slot. A dispatch pass walks the
//! unresolved items, resolving those the registry has handlers for and
//! deferring the rest; in parallel mode each batch item runs in its own
//! spawned task and writes only its own slot, with a join barrier before
//! anything is merged. The final merge assembles slots in original index
//! order regardless of which pass (or task) filled them.
//!
//! A [`DispatchPipeline`] chains several dispatchers over the same payload:
//! each stage runs one pass, deferred items flow to the next stage, and
//! whatever is still unresolved after the last stage settles as
//! Method-not-found (calls) or is dropped (notifications). Resolved slots
//! are never revisited by later stages.
//!
//! # Outcome shape
//!
//! The HTTP status is always 200; JSON-RPC signals failure in the body.
//! A payload of nothing-but-notifications produces an empty body with a
//! plain-text content type.

use crate::config::{DispatcherConfig, ErrorHook};
use crate::envelope::Envelope;
use crate::handler::{CallContext, SharedState};
use crate::registry::MethodRegistry;
use futures::future::join_all;
use jroh_core::codec::Payload;
use jroh_core::error::{Error, ErrorData};
use jroh_core::types::{Id, Response};
use jroh_core::validate::{copied_id, is_notification, request_is_valid};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Content type of the outgoing HTTP body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// `application/json`
    Json,
    /// `text/plain` (empty bodies only)
    Plain,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Plain => "text/plain",
        }
    }
}

/// What the transport layer should send back: a body (or none), its content
/// type, and the HTTP status.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub body: Option<Value>,
    pub content_type: ContentType,
    pub status: u16,
}

impl DispatchOutcome {
    /// A JSON body outcome.
    pub fn json(body: Value) -> Self {
        Self {
            body: Some(body),
            content_type: ContentType::Json,
            status: 200,
        }
    }

    /// The empty outcome for notification-only payloads.
    pub fn empty() -> Self {
        Self {
            body: None,
            content_type: ContentType::Plain,
            status: 200,
        }
    }

    /// The single Parse-error response for unparseable bodies.
    pub fn parse_error() -> Self {
        Self::json(Response::error(ErrorData::parse_error(), Id::Null).into_value())
    }

    /// Serialize the body to bytes, if there is one.
    pub fn body_bytes(&self) -> Option<Vec<u8>> {
        self.body.as_ref().and_then(|body| serde_json::to_vec(body).ok())
    }
}

/// Whether one pass settled an item or handed it onward.
enum Resolution {
    /// No handler in this registry; a later pass may claim it
    Deferred,
    /// Settled: `Some` response entry, or `None` for a silent notification
    Resolved(Option<Value>),
}

/// Mutable per-payload state threaded through the passes of a dispatch.
struct DispatchState {
    items: Vec<Value>,
    slots: Vec<Option<Value>>,
    resolved: Vec<bool>,
    batch: bool,
    shared: SharedState,
}

impl DispatchState {
    fn from_payload(payload: Payload) -> Self {
        let batch = payload.is_batch();
        let items: Vec<Value> = payload.items().to_vec();
        let len = items.len();
        Self {
            items,
            slots: vec![None; len],
            resolved: vec![false; len],
            batch,
            shared: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn fully_resolved(&self) -> bool {
        self.resolved.iter().all(|r| *r)
    }

    /// Settle leftovers and merge the slots into the final outcome.
    ///
    /// Unresolved valid notifications are dropped; every other unresolved
    /// item becomes a Method-not-found entry carrying whatever id can be
    /// copied out of it. The merge walks slots in original index order.
    fn finish(mut self) -> DispatchOutcome {
        for index in 0..self.items.len() {
            if self.resolved[index] {
                continue;
            }
            let item = &self.items[index];
            if request_is_valid(item) && is_notification(item) {
                self.slots[index] = None;
            } else {
                self.slots[index] = Some(
                    Response::error(ErrorData::method_not_found(), copied_id(item)).into_value(),
                );
            }
            self.resolved[index] = true;
        }

        if self.batch {
            let entries: Vec<Value> = self.slots.into_iter().flatten().collect();
            if entries.is_empty() {
                return DispatchOutcome::empty();
            }
            return DispatchOutcome::json(Value::Array(entries));
        }
        match self.slots.into_iter().next().flatten() {
            Some(entry) => DispatchOutcome::json(entry),
            None => DispatchOutcome::empty(),
        }
    }
}

/// Resolve one item against one registry: validate, look up, run the chain.
async fn resolve_item(
    item: Value,
    registry: MethodRegistry,
    hook: Option<Arc<dyn ErrorHook>>,
    shared: SharedState,
) -> Resolution {
    let envelope = Envelope::from_request(item);
    if !envelope.is_valid() {
        // invalid items settle in any pass; the validator owns the mapping
        return Resolution::Resolved(envelope.response());
    }

    let method = envelope
        .request()
        .and_then(|req| req.get("method"))
        .and_then(|m| m.as_str())
        .map(str::to_owned);
    let chain = match method.as_deref().and_then(|m| registry.get(m)) {
        Some(chain) => chain.clone(),
        None => return Resolution::Deferred,
    };

    let ctx = CallContext::new(envelope, shared);
    if let Err(error) = chain.run(ctx.clone()).await {
        apply_failure(error, &ctx, hook.as_deref()).await;
    }
    Resolution::Resolved(ctx.response().await)
}

/// Map a handler-chain failure onto the item's response.
///
/// `Error::JsonRpc` carries an exact wire error and is set verbatim. For
/// anything else the hook (when installed) gets first refusal; if it fails
/// or writes nothing coherent, the fallback is a -32000 Server error with
/// the failure description in `data`.
async fn apply_failure(error: Error, ctx: &CallContext, hook: Option<&dyn ErrorHook>) {
    if let Error::JsonRpc(data) = error {
        ctx.set_error(Some(data)).await;
        return;
    }
    if let Some(hook) = hook {
        match hook.handle(&error, ctx).await {
            Ok(()) => {
                let wrote_outcome = ctx
                    .with_envelope(|envelope| {
                        envelope.error().is_some() || envelope.result().is_some()
                    })
                    .await;
                if wrote_outcome {
                    return;
                }
            }
            Err(hook_error) => {
                warn!(error = %hook_error, "error hook failed, using default mapping");
            }
        }
    }
    ctx.server_error(None, Some(Value::String(error.to_string())))
        .await;
}

/// The dispatch engine: a method registry plus its configuration.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: MethodRegistry,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(registry: MethodRegistry) -> Self {
        Self::with_config(registry, DispatcherConfig::default())
    }

    pub fn with_config(registry: MethodRegistry, config: DispatcherConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Dispatch raw body bytes, running the configured body parser first.
    /// `None` bytes or a parser failure yield the Parse-error outcome.
    pub async fn dispatch_raw(&self, raw: Option<&[u8]>) -> DispatchOutcome {
        let parsed = raw.and_then(|raw| self.config.parse_body(raw));
        self.dispatch(parsed).await
    }

    /// Dispatch an already-parsed payload value.
    ///
    /// `None` means body parsing failed upstream and maps to the single
    /// Parse-error response. An empty batch maps to the single
    /// Invalid-Request response.
    #[instrument(skip(self, payload), fields(parallel = self.config.is_parallel()))]
    pub async fn dispatch(&self, payload: Option<Value>) -> DispatchOutcome {
        let payload = match payload {
            Some(payload) => Payload::classify(payload),
            None => {
                debug!("unparseable body, returning parse error");
                return DispatchOutcome::parse_error();
            }
        };
        if let Some(outcome) = reject_degenerate(&payload) {
            return outcome;
        }

        if !self.registry.handlers_present(&payload) {
            debug!("payload names methods this registry does not serve");
        }

        let mut state = DispatchState::from_payload(payload);
        self.run_pass(&mut state).await;
        state.finish()
    }

    /// Run one pass over the unresolved items.
    async fn run_pass(&self, state: &mut DispatchState) {
        let pending: Vec<usize> = (0..state.items.len())
            .filter(|&index| !state.resolved[index])
            .collect();

        if self.config.is_parallel() && state.batch && pending.len() > 1 {
            let tasks: Vec<_> = pending
                .iter()
                .map(|&index| {
                    tokio::spawn(resolve_item(
                        state.items[index].clone(),
                        self.registry.clone(),
                        self.config.error_hook().cloned(),
                        Arc::clone(&state.shared),
                    ))
                })
                .collect();
            // join barrier: every task finishes before any slot merges
            let results = join_all(tasks).await;
            for (&index, result) in pending.iter().zip(results) {
                let resolution = match result {
                    Ok(resolution) => resolution,
                    Err(join_error) => {
                        warn!(error = %join_error, index, "dispatch task failed");
                        Resolution::Resolved(Some(
                            Response::error(
                                ErrorData::internal_error(),
                                copied_id(&state.items[index]),
                            )
                            .into_value(),
                        ))
                    }
                };
                apply_resolution(state, index, resolution);
            }
        } else {
            for index in pending {
                let resolution = resolve_item(
                    state.items[index].clone(),
                    self.registry.clone(),
                    self.config.error_hook().cloned(),
                    Arc::clone(&state.shared),
                )
                .await;
                apply_resolution(state, index, resolution);
            }
        }
    }
}

fn apply_resolution(state: &mut DispatchState, index: usize, resolution: Resolution) {
    match resolution {
        Resolution::Deferred => {}
        Resolution::Resolved(entry) => {
            state.slots[index] = entry;
            state.resolved[index] = true;
        }
    }
}

/// The empty batch short-circuits before any pass runs: a single
/// Invalid-Request object, not an empty array.
fn reject_degenerate(payload: &Payload) -> Option<DispatchOutcome> {
    if payload.is_empty() {
        return Some(DispatchOutcome::json(
            Response::error(ErrorData::invalid_request(), Id::Null).into_value(),
        ));
    }
    None
}

/// Several dispatchers chained over one payload, for apps that mount more
/// than one method registry.
#[derive(Debug, Clone, Default)]
pub struct DispatchPipeline {
    stages: Vec<Dispatcher>,
}

impl DispatchPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a dispatcher stage. Stages run in insertion order.
    pub fn stage(mut self, dispatcher: Dispatcher) -> Self {
        self.stages.push(dispatcher);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run the payload through the stages: each stage gets one pass over
    /// whatever the earlier stages deferred.
    #[instrument(skip(self, payload), fields(stages = self.stages.len()))]
    pub async fn dispatch(&self, payload: Option<Value>) -> DispatchOutcome {
        let payload = match payload {
            Some(payload) => Payload::classify(payload),
            None => return DispatchOutcome::parse_error(),
        };
        if let Some(outcome) = reject_degenerate(&payload) {
            return outcome;
        }

        let mut state = DispatchState::from_payload(payload);
        for dispatcher in &self.stages {
            if state.fully_resolved() {
                break;
            }
            dispatcher.run_pass(&mut state).await;
        }
        state.finish()
    }
}
