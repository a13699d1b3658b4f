//! Durable execution state handles and the atomic resume lock.
//!
//! A handle maps a caller-visible `state_key` to a provider-internal
//! reference. The reference is pure routing data: it never crosses the
//! port boundary, is excluded from `Debug` output, and is only readable
//! inside the engine.
//!
//! Lock claims are a single conditional update executed atomically by the
//! store — never a read-then-write pair — so two concurrent resumes cannot
//! both observe "unlocked".

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::engine::port::RunOutcome;

/// Handle lifecycle: `Active` handles may pause and resume; terminal
/// states reject further resumes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandleStatus {
    Active,
    Completed,
    Expired,
}

/// Routing record for one pausable execution lineage.
#[derive(Clone)]
pub struct ExecutionStateHandle {
    pub tenant_id: String,
    pub state_key: String,
    pub provider_id: String,
    provider_ref: String,
    pub status: HandleStatus,
    pub lock_holder_id: Option<String>,
    pub lock_acquired_at: Option<DateTime<Utc>>,
    pub last_resume_id: Option<String>,
    pub cached_outcome: Option<RunOutcome>,
}

impl ExecutionStateHandle {
    pub fn new(
        tenant_id: impl Into<String>,
        state_key: impl Into<String>,
        provider_id: impl Into<String>,
        provider_ref: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            state_key: state_key.into(),
            provider_id: provider_id.into(),
            provider_ref: provider_ref.into(),
            status: HandleStatus::Active,
            lock_holder_id: None,
            lock_acquired_at: None,
            last_resume_id: None,
            cached_outcome: None,
        }
    }

    /// Provider-internal reference. Engine-only; never exposed to callers.
    pub(crate) fn provider_ref(&self) -> &str {
        &self.provider_ref
    }
}

impl std::fmt::Debug for ExecutionStateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionStateHandle")
            .field("tenant_id", &self.tenant_id)
            .field("state_key", &self.state_key)
            .field("provider_id", &self.provider_id)
            .field("provider_ref", &"<redacted>")
            .field("status", &self.status)
            .field("lock_holder_id", &self.lock_holder_id)
            .field("lock_acquired_at", &self.lock_acquired_at)
            .field("last_resume_id", &self.last_resume_id)
            .finish()
    }
}

/// Result of persisting a fresh pause handle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandleInsert {
    Inserted,
    /// The key already has an active or locked handle.
    Conflict,
}

/// Result of an atomic lock claim.
#[derive(Debug)]
pub enum LockClaim {
    Claimed(ExecutionStateHandle),
    /// Zero rows affected: a live lock is held by someone else, or the
    /// handle is not `Active`.
    Conflict,
    NotFound,
}

/// Fields written back when a lock is released.
#[derive(Clone, Debug)]
pub struct LockRelease {
    pub status: HandleStatus,
    pub last_resume_id: String,
    pub cached_outcome: RunOutcome,
    /// A resume that paused again carries a fresh provider reference.
    pub provider_ref: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("state storage unavailable: {0}")]
    Unavailable(String),

    #[error("state handle not found: {state_key}")]
    NotFound { state_key: String },

    #[error("lock on {state_key} not held by {holder_id}")]
    LockNotHeld {
        state_key: String,
        holder_id: String,
    },
}

/// Durable `(tenant_id, state_key)` → handle map with lease-based locking.
pub trait ExecutionStateStore: Send + Sync {
    /// Persist a fresh pause handle for `(tenant_id, state_key)`. Never
    /// replaces an active or locked handle: a held lock and the replay
    /// history it guards are mutated only through claim/release. A
    /// terminal, unlocked handle may be replaced to start a new lineage
    /// on the key.
    fn insert(&self, handle: ExecutionStateHandle) -> Result<HandleInsert, StateStoreError>;

    fn get(&self, tenant_id: &str, state_key: &str) -> Option<ExecutionStateHandle>;

    /// Atomically claim the resume lock: succeeds iff the handle is
    /// `Active` and no lock is held or the held lock is older than
    /// `lease`. One conditional update, no separate read-then-write.
    fn try_claim(
        &self,
        tenant_id: &str,
        state_key: &str,
        holder_id: &str,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> LockClaim;

    /// Release a held lock, recording the resume id and cached outcome.
    fn release(
        &self,
        tenant_id: &str,
        state_key: &str,
        holder_id: &str,
        release: LockRelease,
    ) -> Result<(), StateStoreError>;
}

/// In-memory state store for tests/local use. Each operation mutates under
/// a single guard, standing in for the relational
/// `UPDATE ... WHERE ... RETURNING` form.
#[derive(Default)]
pub struct InMemoryExecutionStateStore {
    handles: Mutex<HashMap<(String, String), ExecutionStateHandle>>,
}

impl InMemoryExecutionStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecutionStateStore for InMemoryExecutionStateStore {
    fn insert(&self, handle: ExecutionStateHandle) -> Result<HandleInsert, StateStoreError> {
        let mut handles = self.handles.lock().unwrap();
        let key = (handle.tenant_id.clone(), handle.state_key.clone());
        if let Some(existing) = handles.get(&key) {
            if existing.status == HandleStatus::Active || existing.lock_holder_id.is_some() {
                return Ok(HandleInsert::Conflict);
            }
        }
        handles.insert(key, handle);
        Ok(HandleInsert::Inserted)
    }

    fn get(&self, tenant_id: &str, state_key: &str) -> Option<ExecutionStateHandle> {
        self.handles
            .lock()
            .unwrap()
            .get(&(tenant_id.to_string(), state_key.to_string()))
            .cloned()
    }

    fn try_claim(
        &self,
        tenant_id: &str,
        state_key: &str,
        holder_id: &str,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> LockClaim {
        let mut handles = self.handles.lock().unwrap();
        let Some(handle) = handles.get_mut(&(tenant_id.to_string(), state_key.to_string()))
        else {
            return LockClaim::NotFound;
        };

        if handle.status != HandleStatus::Active {
            return LockClaim::Conflict;
        }
        let lock_is_free = match handle.lock_acquired_at {
            None => true,
            Some(acquired_at) => now - acquired_at > lease,
        };
        if !lock_is_free {
            return LockClaim::Conflict;
        }

        handle.lock_holder_id = Some(holder_id.to_string());
        handle.lock_acquired_at = Some(now);
        LockClaim::Claimed(handle.clone())
    }

    fn release(
        &self,
        tenant_id: &str,
        state_key: &str,
        holder_id: &str,
        release: LockRelease,
    ) -> Result<(), StateStoreError> {
        let mut handles = self.handles.lock().unwrap();
        let handle = handles
            .get_mut(&(tenant_id.to_string(), state_key.to_string()))
            .ok_or_else(|| StateStoreError::NotFound {
                state_key: state_key.to_string(),
            })?;

        if handle.lock_holder_id.as_deref() != Some(holder_id) {
            // The lease expired and another resume took over.
            return Err(StateStoreError::LockNotHeld {
                state_key: state_key.to_string(),
                holder_id: holder_id.to_string(),
            });
        }

        handle.lock_holder_id = None;
        handle.lock_acquired_at = None;
        handle.status = release.status;
        handle.last_resume_id = Some(release.last_resume_id);
        handle.cached_outcome = Some(release.cached_outcome);
        if let Some(provider_ref) = release.provider_ref {
            handle.provider_ref = provider_ref;
        }
        Ok(())
    }
}
