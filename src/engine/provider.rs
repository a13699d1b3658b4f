//! Provider adapter boundary.
//!
//! Each back-end implements [`GraphProvider`]; all execution semantics live
//! behind it. Adapter failures are normalized by construction: a
//! [`ProviderError`] carries a taxonomy code, so no raw provider error type
//! can cross the port boundary.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::engine::cancel::CancellationToken;
use crate::engine::error::ErrorCode;
use crate::engine::event::{Event, TokenUsage};
use crate::engine::port::{BillingContext, EventStream, GraphId, InterruptEnvelope};

/// Sending side of a run's event stream.
///
/// The channel is bounded; `emit` applies backpressure to the producing
/// provider when downstream pumps fall behind.
#[derive(Clone)]
pub struct EventTx {
    tx: mpsc::Sender<Event>,
}

impl EventTx {
    pub async fn emit(&self, event: Event) -> Result<(), EventStreamClosed> {
        self.tx.send(event).await.map_err(|_| EventStreamClosed)
    }
}

/// The engine-side pump dropped its receiver. Providers treat this as an
/// instruction to stop producing.
#[derive(Debug, thiserror::Error)]
#[error("run event stream closed")]
pub struct EventStreamClosed;

/// Bounded event channel between a run task and its consumer pump.
pub fn event_channel(capacity: usize) -> (EventTx, EventStream) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventTx { tx }, EventStream::new(rx))
}

/// Run-scoped context handed to a provider: identifiers, the event sender,
/// the billing scope, and the cooperative cancellation token. Explicitly
/// passed, never a process-global.
pub struct RunContext {
    pub run_id: String,
    pub attempt: u32,
    pub events: EventTx,
    pub billing: BillingContext,
    pub cancel: CancellationToken,
}

/// Normalized provider failure.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: ErrorCode,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Aborted, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RateLimit, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

/// Provider-side terminal result of a run or resume call.
///
/// `NeedsInput` carries the provider-internal reference for the paused
/// session. The engine persists it in the state store and never lets it
/// cross the port boundary.
#[derive(Debug)]
pub enum ProviderOutcome {
    Completed {
        content: String,
        usage: TokenUsage,
    },
    NeedsInput {
        provider_ref: String,
        interrupt: InterruptEnvelope,
    },
}

/// Uniform execution contract implemented per back-end.
///
/// Contract: providers emit `text_delta`/`tool_call_*`/`usage_report`
/// events through the context and return the terminal result. The engine
/// owns the terminal `done`/`error` event; providers never emit one.
#[async_trait]
pub trait GraphProvider: Send + Sync {
    /// Namespace this provider serves; the routing prefix of its graph ids.
    fn id(&self) -> &str;

    fn can_handle(&self, graph_id: &GraphId) -> bool {
        graph_id.provider() == self.id()
    }

    async fn run(
        &self,
        graph_id: &GraphId,
        input: serde_json::Value,
        ctx: &RunContext,
    ) -> Result<ProviderOutcome, ProviderError>;

    /// Continue a paused session identified by `provider_ref`.
    async fn resume(
        &self,
        provider_ref: &str,
        value: serde_json::Value,
        ctx: &RunContext,
    ) -> Result<ProviderOutcome, ProviderError>;
}
