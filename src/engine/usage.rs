//! Usage facts and idempotency key derivation.
//!
//! A [`UsageFact`] is one unit of billable telemetry emitted during a run.
//! Its idempotency key is the sole uniqueness boundary for ledger writes:
//! `(source_system, "{run_id}/{attempt}/{usage_unit_id}")`. Key derivation
//! is pure so the same fact always yields the same key under replay.

use serde::{Deserialize, Serialize};

use crate::engine::event::TokenUsage;

/// One unit of billable telemetry emitted during a run.
///
/// `usage_unit_id` is the adapter-supplied stable identifier for one
/// billable call. Its absence is an integration defect, not a normal path;
/// the billing decorator assigns a deterministic fallback key in that case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UsageFact {
    pub run_id: String,
    pub attempt: u32,
    pub usage_unit_id: Option<String>,
    /// Which back-end produced this fact (the `source_system` of the key).
    pub source: String,
    pub tenant_id: String,
    pub account_id: String,
    /// Telemetry correlation id. Not unique: many facts may share it.
    pub request_id: String,
    pub tokens: TokenUsage,
    pub cost: f64,
}

impl UsageFact {
    /// Syntactic validation of required fields. Does not require
    /// `usage_unit_id`; that absence has its own fallback path.
    pub fn validate(&self) -> Result<(), UsageFactError> {
        if self.run_id.is_empty() {
            return Err(UsageFactError::MissingField("run_id"));
        }
        if self.source.is_empty() {
            return Err(UsageFactError::MissingField("source"));
        }
        if self.tenant_id.is_empty() {
            return Err(UsageFactError::MissingField("tenant_id"));
        }
        if self.account_id.is_empty() {
            return Err(UsageFactError::MissingField("account_id"));
        }
        if let Some(unit) = &self.usage_unit_id {
            if unit.is_empty() {
                return Err(UsageFactError::EmptyUsageUnitId);
            }
        }
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(UsageFactError::InvalidCost(self.cost));
        }
        Ok(())
    }
}

/// Validation failures for usage facts.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum UsageFactError {
    #[error("usage fact missing required field: {0}")]
    MissingField(&'static str),

    #[error("usage fact has empty usage_unit_id")]
    EmptyUsageUnitId,

    #[error("usage fact has invalid cost: {0}")]
    InvalidCost(f64),
}

/// The composite idempotency key for one ledger write.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyKey {
    pub source_system: String,
    pub source_reference: String,
}

impl IdempotencyKey {
    /// Derive the canonical key. Returns `None` when `usage_unit_id` is
    /// absent; the caller must then go through [`IdempotencyKey::fallback`].
    pub fn for_fact(fact: &UsageFact) -> Option<Self> {
        let unit = fact.usage_unit_id.as_deref()?;
        Some(Self {
            source_system: fact.source.clone(),
            source_reference: format!("{}/{}/{}", fact.run_id, fact.attempt, unit),
        })
    }

    /// Deterministic fallback key for facts without a `usage_unit_id`,
    /// derived from the per-run billing call index. Never wall-clock time:
    /// a replay with the same call-index sequence must produce the same key.
    pub fn fallback(fact: &UsageFact, call_index: u64) -> Self {
        Self {
            source_system: fact.source.clone(),
            source_reference: format!("MISSING:{}/{}", fact.run_id, call_index),
        }
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source_system, self.source_reference)
    }
}

#[cfg(test)]
pub(crate) fn fact_fixture(run_id: &str, unit: Option<&str>) -> UsageFact {
    UsageFact {
        run_id: run_id.to_string(),
        attempt: 0,
        usage_unit_id: unit.map(str::to_string),
        source: "demo".to_string(),
        tenant_id: "tenant-1".to_string(),
        account_id: "acct-1".to_string(),
        request_id: "req-1".to_string(),
        tokens: TokenUsage::default(),
        cost: 0.25,
    }
}
