//! Event protocol for streaming execution.
//!
//! This is the wire-level contract of the run stream, stable across all
//! providers. Per run attempt: `usage_report` 1..N (each uniquely keyed),
//! at most one `assistant_final`, and exactly one terminal event
//! (`done` or `error`), observed last.

use serde::{Deserialize, Serialize};

use crate::engine::error::ErrorCode;
use crate::engine::usage::UsageFact;

/// Token usage breakdown (input/output/reasoning/cache).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub reasoning: u64,
    pub cache_read: u64,
    pub cache_write: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input + self.output + self.reasoning + self.cache_read + self.cache_write
    }
}

/// Runtime events emitted during execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TextDelta {
        run_id: String,
        message_id: String,
        delta: String,
    },
    ToolCallStart {
        run_id: String,
        tool: String,
        call_id: String,
        input: serde_json::Value,
    },
    ToolCallResult {
        run_id: String,
        tool: String,
        call_id: String,
        output: serde_json::Value,
    },
    UsageReport {
        fact: UsageFact,
    },
    AssistantFinal {
        run_id: String,
        content: String,
    },
    Done {
        run_id: String,
    },
    Error {
        run_id: String,
        code: ErrorCode,
        message: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::TextDelta { .. } => "text_delta",
            Event::ToolCallStart { .. } => "tool_call_start",
            Event::ToolCallResult { .. } => "tool_call_result",
            Event::UsageReport { .. } => "usage_report",
            Event::AssistantFinal { .. } => "assistant_final",
            Event::Done { .. } => "done",
            Event::Error { .. } => "error",
        }
    }

    /// Terminal events close a run attempt; exactly one is produced.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Done { .. } | Event::Error { .. })
    }
}
