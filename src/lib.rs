//! Gantry: an execution gateway and usage ledger for agentic workflow back-ends.
//!
//! One uniform [`engine::port::GraphExecutorPort`] sits in front of
//! heterogeneous graph providers. Every run streams events to independently
//! paced consumers through the [`engine::relay::EventRelay`], usage telemetry
//! is committed to an idempotent charge ledger by the
//! [`engine::billing::BillingDecorator`], and paused runs resume through a
//! lease-locked [`engine::state::ExecutionStateStore`].

pub mod engine;
