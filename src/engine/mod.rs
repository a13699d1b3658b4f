//! Gantry Engine
//!
//! Execution gateway and billing ledger for agentic workflow back-ends.
//!
//! ## Features
//!
//! - **Uniform execution port**: one `run_graph` contract over every provider
//! - **Decorator stack**: observability and billing wrap the port transparently
//! - **Event fan-out**: one run stream, N subscribers with per-tap loss policies
//! - **Idempotent ledger**: at most one charge per `(run_id, attempt, usage_unit_id)`
//! - **Pause/Resume**: durable state handles behind an atomic lease lock
//!
//! # Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use gantry::engine::prelude::*;
//!
//! # async fn run(provider: Arc<dyn GraphProvider>) {
//! let catalog = AgentCatalog::from_entries(vec![AgentEntry::new(
//!     "writer", "demo:writer", "Writer", "drafts replies",
//! )]);
//! let store = Arc::new(InMemoryExecutionStateStore::new());
//! let ledger = Arc::new(InMemoryChargeLedger::new());
//! let config = EngineConfig::new();
//!
//! let executor = AggregatingExecutor::new(vec![provider], catalog, store, config.clone());
//! let port = ObservabilityDecorator::new(
//!     BillingDecorator::new(executor, Arc::new(LedgerCommitter::new(ledger)), config.clone()),
//!     config,
//! );
//!
//! let mut handle = port.run_graph(RunRequest::new(
//!     "demo:writer",
//!     serde_json::json!({"prompt": "hi"}),
//!     BillingContext::new("tenant-1", "acct-1", "req-1"),
//! ));
//! while let Some(event) = handle.events.next().await {
//!     println!("{}", event.name());
//! }
//! let outcome = handle.outcome.wait().await;
//! # let _ = outcome;
//! # }
//! ```

// Core modules
pub mod error;
pub mod cancel;
pub mod event;
pub mod usage;
pub mod ledger;
pub mod catalog;
pub mod config;
pub mod port;
pub mod provider;
pub mod state;
pub mod resume;
pub mod router;
pub mod billing;
pub mod observe;
pub mod relay;

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::engine::error::{EngineError, ErrorCode};
    pub use crate::engine::cancel::CancellationToken;
    pub use crate::engine::event::{Event, TokenUsage};
    pub use crate::engine::usage::{IdempotencyKey, UsageFact};
    pub use crate::engine::ledger::{
        ChargeLedger,
        ChargeReceipt,
        ChargeStatus,
        CommitOutcome,
        InMemoryChargeLedger,
    };
    pub use crate::engine::catalog::{AgentCatalog, AgentEntry};
    pub use crate::engine::config::EngineConfig;
    pub use crate::engine::port::{
        BillingContext,
        EventStream,
        GraphExecutorPort,
        GraphId,
        InterruptEnvelope,
        ResumeRequest,
        RunCompletion,
        RunHandle,
        RunOutcome,
        RunRequest,
    };
    pub use crate::engine::provider::{
        EventTx,
        GraphProvider,
        ProviderError,
        ProviderOutcome,
        RunContext,
    };
    pub use crate::engine::state::{
        ExecutionStateHandle,
        ExecutionStateStore,
        HandleInsert,
        HandleStatus,
        InMemoryExecutionStateStore,
        LockClaim,
    };
    pub use crate::engine::router::AggregatingExecutor;
    pub use crate::engine::billing::{BillingDecorator, LedgerCommitter, UsageCommitter};
    pub use crate::engine::observe::ObservabilityDecorator;
    pub use crate::engine::relay::{DeliveryPolicy, EventRelay};
}
