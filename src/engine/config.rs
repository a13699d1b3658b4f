//! Engine configuration.

use chrono::Duration;

/// Tunables for run streams, fan-out queues, and the resume protocol.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Capacity of each run's upstream event channel.
    pub event_buffer: usize,
    /// Queue capacity for lossless relay taps.
    pub lossless_queue: usize,
    /// Queue capacity for best-effort relay taps.
    pub best_effort_queue: usize,
    /// Resume lock lease; a held lock older than this is stale.
    pub resume_lease: Duration,
    /// Upper bound on a serialized resume payload.
    pub max_resume_bytes: usize,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            event_buffer: 64,
            lossless_queue: 64,
            best_effort_queue: 128,
            resume_lease: Duration::seconds(30),
            max_resume_bytes: 64 * 1024,
        }
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }

    pub fn with_lossless_queue(mut self, capacity: usize) -> Self {
        self.lossless_queue = capacity.max(1);
        self
    }

    pub fn with_best_effort_queue(mut self, capacity: usize) -> Self {
        self.best_effort_queue = capacity.max(1);
        self
    }

    pub fn with_resume_lease(mut self, lease: Duration) -> Self {
        self.resume_lease = lease;
        self
    }

    pub fn with_max_resume_bytes(mut self, bytes: usize) -> Self {
        self.max_resume_bytes = bytes;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
