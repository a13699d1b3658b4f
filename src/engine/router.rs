//! Aggregating executor: routes run requests to the matching provider.
//!
//! Routing is the only business logic here. Graph ids are namespaced
//! `{provider_id}:{graph_name}`; the catalog and the provider set are
//! fixed at startup. Everything else — execution, pausing, resuming —
//! is delegated.

use std::sync::Arc;

use crate::engine::cancel::CancellationToken;
use crate::engine::catalog::AgentCatalog;
use crate::engine::config::EngineConfig;
use crate::engine::error::{EngineError, ErrorCode};
use crate::engine::event::Event;
use crate::engine::port::{
    GraphExecutorPort,
    GraphId,
    RunCompletion,
    RunHandle,
    RunOutcome,
    RunRequest,
};
use crate::engine::provider::{event_channel, GraphProvider, ProviderOutcome, RunContext};
use crate::engine::resume::ResumeCoordinator;
use crate::engine::state::{ExecutionStateHandle, ExecutionStateStore, HandleInsert};

pub struct AggregatingExecutor {
    inner: Arc<Inner>,
}

struct Inner {
    providers: Vec<Arc<dyn GraphProvider>>,
    catalog: AgentCatalog,
    store: Arc<dyn ExecutionStateStore>,
    resume: ResumeCoordinator,
    config: EngineConfig,
}

impl AggregatingExecutor {
    pub fn new(
        providers: Vec<Arc<dyn GraphProvider>>,
        catalog: AgentCatalog,
        store: Arc<dyn ExecutionStateStore>,
        config: EngineConfig,
    ) -> Self {
        let resume = ResumeCoordinator::new(store.clone(), providers.clone(), &config);
        Self {
            inner: Arc::new(Inner {
                providers,
                catalog,
                store,
                resume,
                config,
            }),
        }
    }
}

impl GraphExecutorPort for AggregatingExecutor {
    fn run_graph(&self, request: RunRequest) -> RunHandle {
        let run_id = uuid::Uuid::new_v4().to_string();
        let (tx, events) = event_channel(self.inner.config.event_buffer);
        let (outcome_tx, completion) = RunCompletion::channel();
        let cancel = CancellationToken::new();

        let ctx = RunContext {
            run_id: run_id.clone(),
            attempt: 0,
            events: tx,
            billing: request.billing.clone(),
            cancel: cancel.clone(),
        };
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let outcome = inner.execute(request, &ctx).await;

            // Terminal event and terminal outcome are two views of one
            // result; they must always agree.
            let terminal = match &outcome {
                RunOutcome::Error { code, message } => Event::Error {
                    run_id: ctx.run_id.clone(),
                    code: *code,
                    message: message.clone(),
                },
                _ => Event::Done {
                    run_id: ctx.run_id.clone(),
                },
            };
            let _ = ctx.events.emit(terminal).await;
            let _ = outcome_tx.send(outcome);
        });

        RunHandle {
            run_id,
            events,
            outcome: completion,
            cancel,
        }
    }
}

impl Inner {
    async fn execute(&self, request: RunRequest, ctx: &RunContext) -> RunOutcome {
        if ctx.cancel.is_cancelled() {
            let reason = ctx.cancel.reason().unwrap_or_else(|| "cancelled".to_string());
            return RunOutcome::error(ErrorCode::Aborted, reason);
        }

        let graph_id = match GraphId::parse(&request.graph_id) {
            Ok(graph_id) => graph_id,
            Err(err) => return reject(err),
        };

        if let Some(resume) = request.resume {
            let Some(state_key) = request.state_key.as_deref() else {
                return RunOutcome::error(
                    ErrorCode::InvalidRequest,
                    "resume requires a state_key",
                );
            };
            let outcome = self
                .resume
                .resume(&request.billing.tenant_id, state_key, resume, ctx)
                .await;
            if let RunOutcome::Completed { content, .. } = &outcome {
                let _ = ctx
                    .events
                    .emit(Event::AssistantFinal {
                        run_id: ctx.run_id.clone(),
                        content: content.clone(),
                    })
                    .await;
            }
            return outcome;
        }

        if !self.catalog.contains(&graph_id) {
            return RunOutcome::error(
                ErrorCode::NotFound,
                format!("graph {graph_id} is not in the agent catalog"),
            );
        }
        let Some(provider) = self
            .providers
            .iter()
            .find(|provider| provider.can_handle(&graph_id))
        else {
            return RunOutcome::error(
                ErrorCode::NotFound,
                format!("no provider registered for {graph_id}"),
            );
        };

        match provider.run(&graph_id, request.input, ctx).await {
            Ok(ProviderOutcome::Completed { content, usage }) => {
                let _ = ctx
                    .events
                    .emit(Event::AssistantFinal {
                        run_id: ctx.run_id.clone(),
                        content: content.clone(),
                    })
                    .await;
                RunOutcome::Completed { content, usage }
            }
            Ok(ProviderOutcome::NeedsInput {
                provider_ref,
                interrupt,
            }) => {
                let state_key = request
                    .state_key
                    .clone()
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                let handle = ExecutionStateHandle::new(
                    request.billing.tenant_id.clone(),
                    state_key.clone(),
                    provider.id(),
                    provider_ref,
                );
                // Conditional write: a live handle on this key may carry a
                // held resume lock, which only claim/release may touch.
                match self.store.insert(handle) {
                    Ok(HandleInsert::Inserted) => RunOutcome::NeedsInput {
                        state_key,
                        interrupt,
                    },
                    Ok(HandleInsert::Conflict) => RunOutcome::error(
                        ErrorCode::Aborted,
                        format!("state key {state_key} already has a live execution handle"),
                    ),
                    Err(err) => {
                        tracing::error!(
                            run_id = %ctx.run_id,
                            state_key,
                            error = %err,
                            "failed to persist pause handle"
                        );
                        RunOutcome::error(
                            ErrorCode::Internal,
                            "failed to persist execution state",
                        )
                    }
                }
            }
            Err(err) => RunOutcome::error(err.code, err.message),
        }
    }
}

fn reject(err: EngineError) -> RunOutcome {
    RunOutcome::error(err.code(), err.to_string())
}
