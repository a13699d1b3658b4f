//! Billing decorator: the single enforcement point for automatic billing.
//!
//! Wraps any [`GraphExecutorPort`] and intercepts `usage_report` events
//! flowing through the stream. Every other event passes through unchanged;
//! usage events are consumed here and never reach downstream consumers.
//! Billing is best-effort-complete and never response-blocking: commit
//! failures are logged and swallowed, and the pump keeps draining upstream
//! even after the downstream consumer disconnects.

use std::sync::Arc;

use crate::engine::config::EngineConfig;
use crate::engine::event::Event;
use crate::engine::ledger::{ChargeLedger, ChargeReceipt, ChargeStatus, CommitOutcome};
use crate::engine::port::{GraphExecutorPort, RunHandle, RunRequest};
use crate::engine::provider::event_channel;
use crate::engine::usage::{IdempotencyKey, UsageFact};

/// Injected commit boundary. Implementations must log-and-swallow their
/// own failures; a commit never aborts the stream.
pub trait UsageCommitter: Send + Sync {
    fn commit(&self, fact: &UsageFact, key: &IdempotencyKey, fallback_keyed: bool);
}

/// Commits usage facts as charge receipts on a [`ChargeLedger`].
pub struct LedgerCommitter {
    ledger: Arc<dyn ChargeLedger>,
}

impl LedgerCommitter {
    pub fn new(ledger: Arc<dyn ChargeLedger>) -> Self {
        Self { ledger }
    }
}

impl UsageCommitter for LedgerCommitter {
    fn commit(&self, fact: &UsageFact, key: &IdempotencyKey, fallback_keyed: bool) {
        let status = if fallback_keyed {
            ChargeStatus::PostedWithFallbackKey
        } else {
            ChargeStatus::Posted
        };
        let receipt = ChargeReceipt::from_fact(fact, key, status);
        match self.ledger.commit(receipt) {
            Ok(CommitOutcome::Committed) => {
                tracing::debug!(run_id = %fact.run_id, key = %key, "charge committed");
            }
            Ok(CommitOutcome::Duplicate) => {
                tracing::debug!(run_id = %fact.run_id, key = %key, "charge replayed; no-op");
            }
            Err(err) => {
                // Critical: a usage fact reached the ledger boundary and
                // was not recorded. Never propagated to the stream.
                tracing::error!(
                    run_id = %fact.run_id,
                    key = %key,
                    error = %err,
                    "ledger commit failed; charge not recorded"
                );
            }
        }
    }
}

/// Pass-through decorator that turns `usage_report` events into ledger
/// commits. Call sites supply only the committer; the interception logic
/// lives here and nowhere else.
pub struct BillingDecorator<P> {
    inner: P,
    committer: Arc<dyn UsageCommitter>,
    config: EngineConfig,
}

impl<P: GraphExecutorPort> BillingDecorator<P> {
    pub fn new(inner: P, committer: Arc<dyn UsageCommitter>, config: EngineConfig) -> Self {
        Self {
            inner,
            committer,
            config,
        }
    }
}

impl<P: GraphExecutorPort> GraphExecutorPort for BillingDecorator<P> {
    fn run_graph(&self, request: RunRequest) -> RunHandle {
        let inner = self.inner.run_graph(request);
        let (tx, events) = event_channel(self.config.event_buffer);
        let committer = Arc::clone(&self.committer);
        let mut upstream = inner.events;

        tokio::spawn(async move {
            // Per-run billing call index. In-memory only: a process crash
            // mid-run resets it, which the fallback-key scheme does not
            // survive (known gap, inherited from the design).
            let mut call_index: u64 = 0;
            let mut downstream_open = true;

            while let Some(event) = upstream.next().await {
                match event {
                    Event::UsageReport { fact } => {
                        call_index += 1;
                        commit_fact(committer.as_ref(), &fact, call_index);
                    }
                    other => {
                        // A disconnected consumer must not stop the drain;
                        // billing still needs every remaining usage event.
                        if downstream_open && tx.emit(other).await.is_err() {
                            downstream_open = false;
                        }
                    }
                }
            }
        });

        RunHandle {
            run_id: inner.run_id,
            events,
            outcome: inner.outcome,
            cancel: inner.cancel,
        }
    }
}

fn commit_fact(committer: &dyn UsageCommitter, fact: &UsageFact, call_index: u64) {
    if let Err(err) = fact.validate() {
        tracing::error!(
            run_id = %fact.run_id,
            error = %err,
            "malformed usage fact rejected; charge not recorded"
        );
        return;
    }

    match IdempotencyKey::for_fact(fact) {
        Some(key) => committer.commit(fact, &key, false),
        None => {
            let key = IdempotencyKey::fallback(fact, call_index);
            tracing::error!(
                run_id = %fact.run_id,
                call_index,
                source = %fact.source,
                "usage fact missing usage_unit_id; billed under fallback key"
            );
            committer.commit(fact, &key, true);
        }
    }
}
