//! Resume protocol: idempotent replay, atomic lock claim, guaranteed release.
//!
//! Protocol order per resume call:
//! 1. payload gate (size/shape) — rejected input never reaches a provider
//! 2. replay check on `last_resume_id` — identical resume ids return the
//!    cached outcome without re-executing
//! 3. atomic lock claim (stale leases may be taken over)
//! 4. provider resume via the private provider reference
//! 5. release, recording the resume id and caching the outcome, on every
//!    path — success, failure, or another pause

use std::sync::Arc;

use crate::engine::config::EngineConfig;
use crate::engine::error::ErrorCode;
use crate::engine::port::{ResumeRequest, RunOutcome};
use crate::engine::provider::{GraphProvider, ProviderOutcome, RunContext};
use crate::engine::state::{
    ExecutionStateStore,
    HandleStatus,
    LockClaim,
    LockRelease,
};

pub struct ResumeCoordinator {
    store: Arc<dyn ExecutionStateStore>,
    providers: Vec<Arc<dyn GraphProvider>>,
    lease: chrono::Duration,
    max_resume_bytes: usize,
}

impl ResumeCoordinator {
    pub fn new(
        store: Arc<dyn ExecutionStateStore>,
        providers: Vec<Arc<dyn GraphProvider>>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            providers,
            lease: config.resume_lease,
            max_resume_bytes: config.max_resume_bytes,
        }
    }

    /// Run one resume attempt against the handle at `(tenant_id, state_key)`.
    pub async fn resume(
        &self,
        tenant_id: &str,
        state_key: &str,
        request: ResumeRequest,
        ctx: &RunContext,
    ) -> RunOutcome {
        if let Err(message) = self.validate_payload(&request.value) {
            return RunOutcome::error(ErrorCode::InvalidRequest, message);
        }

        let Some(handle) = self.store.get(tenant_id, state_key) else {
            return RunOutcome::error(
                ErrorCode::NotFound,
                format!("no execution state for key {state_key}"),
            );
        };

        if handle.last_resume_id.as_deref() == Some(request.resume_id.as_str()) {
            tracing::info!(
                state_key,
                resume_id = %request.resume_id,
                "resume replay; returning cached outcome"
            );
            return handle.cached_outcome.clone().unwrap_or_else(|| {
                RunOutcome::error(
                    ErrorCode::Internal,
                    "resume id recorded without a cached outcome",
                )
            });
        }

        let holder_id = uuid::Uuid::new_v4().to_string();
        let claimed = match self.store.try_claim(
            tenant_id,
            state_key,
            &holder_id,
            chrono::Utc::now(),
            self.lease,
        ) {
            LockClaim::Claimed(handle) => handle,
            LockClaim::Conflict => {
                return RunOutcome::error(
                    ErrorCode::Aborted,
                    format!("resume conflict: state {state_key} is locked or not active"),
                );
            }
            LockClaim::NotFound => {
                return RunOutcome::error(
                    ErrorCode::NotFound,
                    format!("no execution state for key {state_key}"),
                );
            }
        };

        let (outcome, status, new_ref) = self.execute(&claimed, &request, ctx).await;

        let release = LockRelease {
            status,
            last_resume_id: request.resume_id.clone(),
            cached_outcome: outcome.clone(),
            provider_ref: new_ref,
        };
        if let Err(err) = self.store.release(tenant_id, state_key, &holder_id, release) {
            // Leaves the handle for the lease sweep; the outcome still
            // flows back to the caller.
            tracing::error!(state_key, error = %err, "failed to release resume lock");
        }

        outcome
    }

    async fn execute(
        &self,
        handle: &crate::engine::state::ExecutionStateHandle,
        request: &ResumeRequest,
        ctx: &RunContext,
    ) -> (RunOutcome, HandleStatus, Option<String>) {
        let Some(provider) = self
            .providers
            .iter()
            .find(|provider| provider.id() == handle.provider_id)
        else {
            tracing::error!(
                provider_id = %handle.provider_id,
                state_key = %handle.state_key,
                "state handle references an unregistered provider"
            );
            return (
                RunOutcome::error(
                    ErrorCode::Internal,
                    format!("provider {} is not registered", handle.provider_id),
                ),
                HandleStatus::Active,
                None,
            );
        };

        match provider
            .resume(handle.provider_ref(), request.value.clone(), ctx)
            .await
        {
            Ok(ProviderOutcome::Completed { content, usage }) => (
                RunOutcome::Completed { content, usage },
                HandleStatus::Completed,
                None,
            ),
            Ok(ProviderOutcome::NeedsInput {
                provider_ref,
                interrupt,
            }) => (
                RunOutcome::NeedsInput {
                    state_key: handle.state_key.clone(),
                    interrupt,
                },
                HandleStatus::Active,
                Some(provider_ref),
            ),
            Err(err) => (
                RunOutcome::error(err.code, err.message),
                HandleStatus::Active,
                None,
            ),
        }
    }

    fn validate_payload(&self, value: &serde_json::Value) -> Result<(), String> {
        if value.is_null() {
            return Err("resume value must not be null".to_string());
        }
        let size = serde_json::to_vec(value)
            .map_err(|err| format!("resume value is not serializable: {err}"))?
            .len();
        if size > self.max_resume_bytes {
            return Err(format!(
                "resume value of {size} bytes exceeds the {} byte limit",
                self.max_resume_bytes
            ));
        }
        Ok(())
    }
}
