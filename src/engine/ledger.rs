//! Append-only charge ledger with a storage-level uniqueness constraint.
//!
//! Safety under concurrent and replayed commits is delegated entirely to
//! the constraint on `(source_system, source_reference)`: the insert is
//! best-effort and a key conflict is a no-op success, never an error.
//! Rows are never updated or deleted.

use std::collections::HashSet;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::engine::usage::{IdempotencyKey, UsageFact};

/// Receipt status. Fallback-keyed rows stay queryable as integration
/// defects without breaking the append-only audit trail.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Posted,
    PostedWithFallbackKey,
}

/// The financial ledger row produced from exactly one usage fact.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub receipt_id: String,
    pub source_system: String,
    pub source_reference: String,
    /// Explicit queryable columns, not buried inside the composite key.
    pub run_id: String,
    pub attempt: u32,
    /// Telemetry correlation id; many receipts may share it.
    pub request_id: String,
    pub tenant_id: String,
    pub amount: f64,
    pub status: ChargeStatus,
    pub created_at: String,
}

impl ChargeReceipt {
    /// Build a receipt from a fact and its derived key. Charge markup is
    /// out of scope here: the amount passes through from telemetry.
    pub fn from_fact(fact: &UsageFact, key: &IdempotencyKey, status: ChargeStatus) -> Self {
        Self {
            receipt_id: uuid::Uuid::new_v4().to_string(),
            source_system: key.source_system.clone(),
            source_reference: key.source_reference.clone(),
            run_id: fact.run_id.clone(),
            attempt: fact.attempt,
            request_id: fact.request_id.clone(),
            tenant_id: fact.tenant_id.clone(),
            amount: fact.cost,
            status,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Result of a commit attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum CommitOutcome {
    /// The row was inserted; this key had no prior financial effect.
    Committed,
    /// The key already has a row. Replay or concurrent retry; no-op.
    Duplicate,
}

/// Storage failures a ledger backend may surface. Key conflicts are not
/// errors and never appear here.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger storage unavailable: {0}")]
    Unavailable(String),
}

/// Append-only charge store. Exactly one logical writer (the billing
/// decorator's committer) is permitted to call `commit`.
pub trait ChargeLedger: Send + Sync {
    /// Insert the receipt unless its idempotency key already exists.
    fn commit(&self, receipt: ChargeReceipt) -> Result<CommitOutcome, LedgerError>;

    /// Receipts recorded for one run, in commit order.
    fn receipts_for_run(&self, run_id: &str) -> Vec<ChargeReceipt>;
}

#[derive(Default)]
struct LedgerRows {
    rows: Vec<ChargeReceipt>,
    keys: HashSet<(String, String)>,
}

/// In-memory ledger for tests/local use. The unique index and the row
/// append happen under one guard, standing in for the relational
/// constraint.
#[derive(Default)]
pub struct InMemoryChargeLedger {
    inner: Mutex<LedgerRows>,
}

impl InMemoryChargeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn receipt_count(&self) -> usize {
        self.inner.lock().unwrap().rows.len()
    }
}

impl ChargeLedger for InMemoryChargeLedger {
    fn commit(&self, receipt: ChargeReceipt) -> Result<CommitOutcome, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let key = (
            receipt.source_system.clone(),
            receipt.source_reference.clone(),
        );
        if !inner.keys.insert(key) {
            return Ok(CommitOutcome::Duplicate);
        }
        inner.rows.push(receipt);
        Ok(CommitOutcome::Committed)
    }

    fn receipts_for_run(&self, run_id: &str) -> Vec<ChargeReceipt> {
        self.inner
            .lock()
            .unwrap()
            .rows
            .iter()
            .filter(|receipt| receipt.run_id == run_id)
            .cloned()
            .collect()
    }
}
