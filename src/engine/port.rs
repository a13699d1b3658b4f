//! The graph executor port: the single public entry point for running graphs.
//!
//! `run_graph` returns a handle immediately; execution proceeds as the
//! event stream is consumed. Callers must drain the stream to completion
//! regardless of whether they still care about its contents — billing
//! commitment is a side effect of stream iteration, not a separate call.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::engine::cancel::CancellationToken;
use crate::engine::error::{EngineError, ErrorCode};
use crate::engine::event::{Event, TokenUsage};

/// A namespaced graph identifier, `{provider_id}:{graph_name}`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct GraphId {
    provider: String,
    graph: String,
}

impl GraphId {
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let (provider, graph) = raw.split_once(':').ok_or_else(|| {
            EngineError::InvalidRequest(format!(
                "graph id `{raw}` is not namespaced as provider:graph"
            ))
        })?;
        if provider.is_empty() || graph.is_empty() {
            return Err(EngineError::InvalidRequest(format!(
                "graph id `{raw}` has an empty provider or graph segment"
            )));
        }
        Ok(Self {
            provider: provider.to_string(),
            graph: graph.to_string(),
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn graph(&self) -> &str {
        &self.graph
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider, self.graph)
    }
}

/// Tenant/billing scope for one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BillingContext {
    pub tenant_id: String,
    pub account_id: String,
    /// Telemetry correlation id supplied by the caller's request.
    pub request_id: String,
}

impl BillingContext {
    pub fn new(
        tenant_id: impl Into<String>,
        account_id: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            account_id: account_id.into(),
            request_id: request_id.into(),
        }
    }
}

/// Resume payload for a paused run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResumeRequest {
    pub resume_id: String,
    pub value: serde_json::Value,
}

impl ResumeRequest {
    pub fn new(resume_id: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            resume_id: resume_id.into(),
            value,
        }
    }
}

/// A request to execute (or resume) one graph run.
///
/// `run_id` is server-minted; callers never supply it.
#[derive(Clone, Debug)]
pub struct RunRequest {
    pub graph_id: String,
    pub input: serde_json::Value,
    pub state_key: Option<String>,
    pub resume: Option<ResumeRequest>,
    pub billing: BillingContext,
}

impl RunRequest {
    pub fn new(
        graph_id: impl Into<String>,
        input: serde_json::Value,
        billing: BillingContext,
    ) -> Self {
        Self {
            graph_id: graph_id.into(),
            input,
            state_key: None,
            resume: None,
            billing,
        }
    }

    pub fn with_state_key(mut self, state_key: impl Into<String>) -> Self {
        self.state_key = Some(state_key.into());
        self
    }

    pub fn with_resume(mut self, resume: ResumeRequest) -> Self {
        self.resume = Some(resume);
        self
    }
}

/// The minimal payload returned when a run pauses. `data` is owned by the
/// specific graph; the core never interprets it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterruptEnvelope {
    pub kind: String,
    pub data: serde_json::Value,
}

impl InterruptEnvelope {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

/// Terminal outcome of one run attempt. Exactly one shape per attempt;
/// `NeedsInput` is a normal terminal shape, not an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed {
        content: String,
        usage: TokenUsage,
    },
    NeedsInput {
        state_key: String,
        interrupt: InterruptEnvelope,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl RunOutcome {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        RunOutcome::Error {
            code,
            message: message.into(),
        }
    }
}

/// Pull-driven view of one run's event sequence.
pub struct EventStream {
    rx: mpsc::Receiver<Event>,
}

impl EventStream {
    pub(crate) fn new(rx: mpsc::Receiver<Event>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the run task has emitted its terminal
    /// event and closed the stream.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Future side of a run: resolves once the run task has finished.
pub struct RunCompletion {
    rx: oneshot::Receiver<RunOutcome>,
}

impl RunCompletion {
    pub(crate) fn channel() -> (oneshot::Sender<RunOutcome>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    pub async fn wait(self) -> RunOutcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            // The run task never drops its sender on a live runtime; a
            // closed channel means the task was torn down mid-run.
            Err(_) => RunOutcome::error(ErrorCode::Internal, "run task dropped its outcome"),
        }
    }
}

/// Stream handle plus terminal-result future for one run attempt.
pub struct RunHandle {
    pub run_id: String,
    pub events: EventStream,
    pub outcome: RunCompletion,
    pub cancel: CancellationToken,
}

/// The single execution interface all callers use.
///
/// `run_graph` must return immediately: it mints ids, spawns the run task,
/// and hands back the stream plus outcome future. It never returns a
/// future that itself resolves to another future.
pub trait GraphExecutorPort: Send + Sync {
    fn run_graph(&self, request: RunRequest) -> RunHandle;
}
