//! Run events.
//!
//! The orchestrator reports every phase transition as a [`RunEvent`] to the
//! [`EventSink`] it was built with. Sinks are injected per orchestrator; there
//! is no process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::state::StateField;
use serde_json::json;
use uuid::Uuid;

/// A phase transition observed during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// The run began at `entry`.
    RunStarted {
        /// Run id.
        run_id: Uuid,
        /// First step to execute.
        entry: String,
    },
    /// A step is about to execute.
    StepStarted {
        /// Run id.
        run_id: Uuid,
        /// Step name.
        step: String,
    },
    /// A step returned `Continue`.
    StepCompleted {
        /// Run id.
        run_id: Uuid,
        /// Step name.
        step: String,
        /// Fields the step changed.
        changed_fields: Vec<StateField>,
        /// Wall time of the step.
        duration_ms: u64,
    },
    /// A step returned `Fail` or broke a state invariant.
    StepFailed {
        /// Run id.
        run_id: Uuid,
        /// Step name.
        step: String,
        /// Failure reason.
        reason: String,
    },
    /// A router picked a route.
    RouteSelected {
        /// Run id.
        run_id: Uuid,
        /// Step whose exit was routed.
        step: String,
        /// Router key.
        route: String,
        /// Target step.
        target: String,
    },
    /// A back-edge was taken.
    RunRetrying {
        /// Run id.
        run_id: Uuid,
        /// Step the run returns to.
        step: String,
        /// Retry number on this edge, starting at 1.
        attempt: u32,
    },
    /// The run reached a terminal step.
    RunSucceeded {
        /// Run id.
        run_id: Uuid,
        /// Number of step executions.
        steps: usize,
        /// Wall time of the run.
        duration_ms: u64,
    },
    /// The run failed.
    RunFailed {
        /// Run id.
        run_id: Uuid,
        /// Error kind and message.
        error: serde_json::Value,
    },
    /// The run observed a cancellation request.
    RunCancelled {
        /// Run id.
        run_id: Uuid,
        /// Cancellation reason.
        reason: String,
    },
}

impl RunEvent {
    /// Dotted event type, e.g. `step.completed`.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run.started",
            Self::StepStarted { .. } => "step.started",
            Self::StepCompleted { .. } => "step.completed",
            Self::StepFailed { .. } => "step.failed",
            Self::RouteSelected { .. } => "route.selected",
            Self::RunRetrying { .. } => "run.retrying",
            Self::RunSucceeded { .. } => "run.succeeded",
            Self::RunFailed { .. } => "run.failed",
            Self::RunCancelled { .. } => "run.cancelled",
        }
    }

    /// Event payload as JSON.
    #[must_use]
    pub fn data(&self) -> serde_json::Value {
        match self {
            Self::RunStarted { run_id, entry } => json!({"run_id": run_id, "entry": entry}),
            Self::StepStarted { run_id, step } => json!({"run_id": run_id, "step": step}),
            Self::StepCompleted {
                run_id,
                step,
                changed_fields,
                duration_ms,
            } => json!({
                "run_id": run_id,
                "step": step,
                "changed_fields": changed_fields,
                "duration_ms": duration_ms,
            }),
            Self::StepFailed { run_id, step, reason } => {
                json!({"run_id": run_id, "step": step, "reason": reason})
            }
            Self::RouteSelected {
                run_id,
                step,
                route,
                target,
            } => json!({"run_id": run_id, "step": step, "route": route, "target": target}),
            Self::RunRetrying {
                run_id,
                step,
                attempt,
            } => json!({"run_id": run_id, "step": step, "attempt": attempt}),
            Self::RunSucceeded {
                run_id,
                steps,
                duration_ms,
            } => json!({"run_id": run_id, "steps": steps, "duration_ms": duration_ms}),
            Self::RunFailed { run_id, error } => json!({"run_id": run_id, "error": error}),
            Self::RunCancelled { run_id, reason } => json!({"run_id": run_id, "reason": reason}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_completed_payload() {
        let run_id = Uuid::new_v4();
        let event = RunEvent::StepCompleted {
            run_id,
            step: "research".to_string(),
            changed_fields: vec![StateField::ResearchData],
            duration_ms: 12,
        };

        assert_eq!(event.event_type(), "step.completed");
        let data = event.data();
        assert_eq!(data["step"], "research");
        assert_eq!(data["changed_fields"][0], "research_data");
        assert_eq!(data["run_id"], run_id.to_string());
    }

    #[test]
    fn test_event_types_are_dotted() {
        let run_id = Uuid::nil();
        let events = [
            RunEvent::RunRetrying {
                run_id,
                step: "copy".to_string(),
                attempt: 1,
            },
            RunEvent::RunCancelled {
                run_id,
                reason: "shutdown".to_string(),
            },
        ];
        let types: Vec<_> = events.iter().map(RunEvent::event_type).collect();
        assert_eq!(types, vec!["run.retrying", "run.cancelled"]);
    }
}
