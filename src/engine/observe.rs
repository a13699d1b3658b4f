//! Observability decorator: run lifecycle logging around any port.
//!
//! Pass-through: every event is forwarded unchanged. Emits structured
//! `tracing` records for run start and run end, with the forwarded event
//! count and wall-clock duration. Like every pump in the stack it keeps
//! draining upstream after its consumer disconnects.

use std::time::Instant;

use crate::engine::config::EngineConfig;
use crate::engine::event::Event;
use crate::engine::port::{GraphExecutorPort, RunHandle, RunRequest};
use crate::engine::provider::event_channel;

pub struct ObservabilityDecorator<P> {
    inner: P,
    event_buffer: usize,
}

impl<P: GraphExecutorPort> ObservabilityDecorator<P> {
    pub fn new(inner: P, config: EngineConfig) -> Self {
        Self {
            inner,
            event_buffer: config.event_buffer,
        }
    }
}

impl<P: GraphExecutorPort> GraphExecutorPort for ObservabilityDecorator<P> {
    fn run_graph(&self, request: RunRequest) -> RunHandle {
        let graph_id = request.graph_id.clone();
        let tenant_id = request.billing.tenant_id.clone();
        let resuming = request.resume.is_some();

        let inner = self.inner.run_graph(request);
        let run_id = inner.run_id.clone();
        tracing::info!(%run_id, %graph_id, %tenant_id, resuming, "run started");

        let (tx, events) = event_channel(self.event_buffer);
        let mut upstream = inner.events;
        let started = Instant::now();
        let log_run_id = run_id.clone();

        tokio::spawn(async move {
            let mut forwarded: u64 = 0;
            let mut terminal: &'static str = "none";
            let mut downstream_open = true;

            while let Some(event) = upstream.next().await {
                forwarded += 1;
                if event.is_terminal() {
                    terminal = event.name();
                }
                if let Event::Error { code, message, .. } = &event {
                    tracing::warn!(run_id = %log_run_id, %code, message, "run errored");
                }
                if downstream_open && tx.emit(event).await.is_err() {
                    downstream_open = false;
                }
            }

            tracing::info!(
                run_id = %log_run_id,
                events = forwarded,
                terminal,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "run stream finished"
            );
        });

        RunHandle {
            run_id,
            events,
            outcome: inner.outcome,
            cancel: inner.cancel,
        }
    }
}
