//! Sequential graph executor.

use super::{RunResult, RunStatus};
use crate::cancellation::CancellationToken;
use crate::errors::{ConfigurationError, RunError};
use crate::events::{EventSink, NoOpEventSink, RunEvent};
use crate::graph::{Exit, Graph, GraphBuilder};
use crate::state::PipelineState;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Executes a compiled [`Graph`] one step at a time.
///
/// The orchestrator holds no per-run state, so one instance behind an
/// `Arc` can serve concurrent runs.
#[derive(Clone)]
pub struct Orchestrator {
    graph: Arc<Graph>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("entry", &self.graph.entry())
            .field("steps", &self.graph.step_names())
            .finish_non_exhaustive()
    }
}

/// Mutable bookkeeping of one run.
struct RunTracker {
    run_id: Uuid,
    started: Instant,
    status: RunStatus,
    executed: Vec<String>,
    retries: HashMap<(String, String), u32>,
}

impl RunTracker {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started: Instant::now(),
            status: RunStatus::Ready,
            executed: Vec::new(),
            retries: HashMap::new(),
        }
    }

    fn transition(&mut self, status: RunStatus) {
        debug!(run_id = %self.run_id, from = %self.status, to = %status, "Run status changed");
        self.status = status;
    }
}

impl Orchestrator {
    /// Creates an orchestrator over a compiled graph.
    #[must_use]
    pub fn new(graph: Graph) -> Self {
        Self {
            graph: Arc::new(graph),
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Compiles the builder and wraps the result.
    pub fn from_builder(builder: GraphBuilder) -> Result<Self, ConfigurationError> {
        Ok(Self::new(builder.compile()?))
    }

    /// Sets the sink that receives run events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the compiled graph.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Runs from the entry step.
    pub async fn run(&self, state: PipelineState) -> RunResult {
        self.execute(self.graph.entry(), state, None).await
    }

    /// Runs from the entry step, stopping between steps once `token` is cancelled.
    pub async fn run_with_cancellation(
        &self,
        state: PipelineState,
        token: &CancellationToken,
    ) -> RunResult {
        self.execute(self.graph.entry(), state, Some(token)).await
    }

    /// Runs from `step`, which may be any registered step.
    pub async fn run_from(&self, step: &str, state: PipelineState) -> RunResult {
        self.execute(step, state, None).await
    }

    /// Runs from `step` with cancellation.
    pub async fn run_from_with_cancellation(
        &self,
        step: &str,
        state: PipelineState,
        token: &CancellationToken,
    ) -> RunResult {
        self.execute(step, state, Some(token)).await
    }

    async fn execute(
        &self,
        start: &str,
        state: PipelineState,
        token: Option<&CancellationToken>,
    ) -> RunResult {
        let tracker = RunTracker::new();
        let span = info_span!("pipeline_run", run_id = %tracker.run_id, entry = start);
        self.drive(start, state, token, tracker).instrument(span).await
    }

    async fn drive(
        &self,
        start: &str,
        mut state: PipelineState,
        token: Option<&CancellationToken>,
        mut run: RunTracker,
    ) -> RunResult {
        if !self.graph.contains(start) {
            let err = RunError::from(ConfigurationError::UnknownStartStep(start.to_string()));
            return self.finish_failed(run, state, err).await;
        }

        info!(entry = start, "Run started");
        self.emit(RunEvent::RunStarted {
            run_id: run.run_id,
            entry: start.to_string(),
        })
        .await;

        let mut current = start.to_string();
        loop {
            if let Some(reason) = token.filter(|t| t.is_cancelled()).map(|t| {
                t.reason().unwrap_or_else(|| "cancelled".to_string())
            }) {
                warn!(step = %current, reason = %reason, "Run cancelled");
                self.emit(RunEvent::RunCancelled {
                    run_id: run.run_id,
                    reason: reason.clone(),
                })
                .await;
                return self
                    .finish_failed(run, state, RunError::Cancelled { reason })
                    .await;
            }

            let Some(step) = self.graph.step(&current).cloned() else {
                let err = RunError::from(ConfigurationError::UnknownStartStep(current));
                return self.finish_failed(run, state, err).await;
            };

            run.transition(RunStatus::Running {
                step: current.clone(),
            });
            self.emit(RunEvent::StepStarted {
                run_id: run.run_id,
                step: current.clone(),
            })
            .await;

            let before = state.clone();
            let step_started = Instant::now();
            let output = step.execute(state).await;
            run.executed.push(current.clone());
            state = output.state;

            if let Some(field) = PipelineState::read_only_violation(&before, &state) {
                let message = format!("modified read-only field '{field}'");
                return self.fail_step(run, state, &current, message).await;
            }

            if let Some(reason) = output.outcome.failure() {
                let reason = reason.to_string();
                return self.fail_step(run, state, &current, reason).await;
            }
            state.error = None;

            let changed_fields = PipelineState::changed_fields(&before, &state);
            debug!(step = %current, changed = ?changed_fields, "Step completed");
            self.emit(RunEvent::StepCompleted {
                run_id: run.run_id,
                step: current.clone(),
                changed_fields,
                duration_ms: elapsed_ms(step_started),
            })
            .await;

            let next = match self.graph.exit(&current) {
                None => return self.finish_succeeded(run, state).await,
                Some(Exit::Direct(next)) => next.clone(),
                Some(Exit::Conditional(exit)) => {
                    let key = exit.router().route(&state);
                    let Some(route) = exit.route(&key) else {
                        let err = RunError::Routing { step: current, key };
                        return self.finish_failed(run, state, err).await;
                    };

                    debug!(step = %current, route = %key, target = %route.target, "Route selected");
                    self.emit(RunEvent::RouteSelected {
                        run_id: run.run_id,
                        step: current.clone(),
                        route: key.clone(),
                        target: route.target.clone(),
                    })
                    .await;

                    if route.back_edge {
                        let counter = run.retries.entry((current.clone(), key)).or_insert(0);
                        if *counter >= exit.max_retries() {
                            let err = RunError::RetryLimitExceeded {
                                step: current,
                                target: route.target.clone(),
                                limit: exit.max_retries(),
                            };
                            return self.finish_failed(run, state, err).await;
                        }
                        *counter += 1;
                        let attempt = *counter;

                        info!(step = %route.target, attempt, "Retrying");
                        run.transition(RunStatus::Retrying {
                            step: route.target.clone(),
                            attempt,
                        });
                        self.emit(RunEvent::RunRetrying {
                            run_id: run.run_id,
                            step: route.target.clone(),
                            attempt,
                        })
                        .await;
                    }
                    route.target.clone()
                }
            };
            current = next;
        }
    }

    async fn emit(&self, event: RunEvent) {
        self.sink.emit(&event).await;
    }

    async fn fail_step(
        &self,
        run: RunTracker,
        state: PipelineState,
        step: &str,
        message: String,
    ) -> RunResult {
        warn!(step, reason = %message, "Step failed");
        self.emit(RunEvent::StepFailed {
            run_id: run.run_id,
            step: step.to_string(),
            reason: message.clone(),
        })
        .await;
        let err = RunError::Step {
            step: step.to_string(),
            message,
        };
        self.finish_failed(run, state, err).await
    }

    async fn finish_failed(
        &self,
        mut run: RunTracker,
        mut state: PipelineState,
        error: RunError,
    ) -> RunResult {
        run.transition(RunStatus::Failed);
        let message = match &error {
            RunError::Step { message, .. } => message.clone(),
            other => other.to_string(),
        };
        state.error.get_or_insert(message);

        warn!(error = %error, steps = run.executed.len(), "Run failed");
        self.emit(RunEvent::RunFailed {
            run_id: run.run_id,
            error: serde_json::to_value(&error).unwrap_or_default(),
        })
        .await;

        RunResult {
            run_id: run.run_id,
            status: run.status,
            final_state: state,
            error: Some(error),
            executed_steps: run.executed,
            duration_ms: elapsed_ms(run.started),
        }
    }

    async fn finish_succeeded(&self, mut run: RunTracker, state: PipelineState) -> RunResult {
        run.transition(RunStatus::Succeeded);
        let duration_ms = elapsed_ms(run.started);

        info!(steps = run.executed.len(), duration_ms, "Run succeeded");
        self.emit(RunEvent::RunSucceeded {
            run_id: run.run_id,
            steps: run.executed.len(),
            duration_ms,
        })
        .await;

        RunResult {
            run_id: run.run_id,
            status: run.status,
            final_state: state,
            error: None,
            executed_steps: run.executed,
            duration_ms,
        }
    }
}
