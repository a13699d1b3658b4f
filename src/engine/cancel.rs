//! Cooperative cancellation for in-flight runs.

use std::sync::{Arc, Mutex};

/// Cancellation token shared between a run handle and the run task.
///
/// Cancelling never tears the event stream down mid-flight; providers check
/// the token at yield points and the run resolves to an `aborted` outcome.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    reason: Arc<Mutex<Option<String>>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self, reason: impl Into<String>) {
        let mut guard = self.reason.lock().unwrap();
        guard.get_or_insert(reason.into());
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason.lock().unwrap().is_some()
    }

    /// Reason supplied by the first `cancel` call, if any.
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().unwrap().clone()
    }
}
