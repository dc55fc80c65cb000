//! Run status and result types.

use crate::errors::RunError;
use crate::state::PipelineState;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Phase of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, no step executed yet.
    Ready,
    /// Executing `step`.
    Running {
        /// Current step.
        step: String,
    },
    /// A retry route was taken back to `step`.
    Retrying {
        /// Step the run returns to.
        step: String,
        /// Retry number on the edge, starting at 1.
        attempt: u32,
    },
    /// A terminal step completed.
    Succeeded,
    /// The run stopped with a [`RunError`].
    Failed,
}

impl RunStatus {
    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Running { step } => write!(f, "running({step})"),
            Self::Retrying { step, attempt } => write!(f, "retrying({step}, attempt {attempt})"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Unique id of the run.
    pub run_id: Uuid,
    /// `Succeeded` or `Failed`.
    pub status: RunStatus,
    /// State after the last executed step.
    pub final_state: PipelineState,
    /// Why the run failed.
    pub error: Option<RunError>,
    /// Step names in execution order, repeats included.
    pub executed_steps: Vec<String>,
    /// Wall time of the run.
    pub duration_ms: u64,
}

impl RunResult {
    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Number of times `step` executed.
    #[must_use]
    pub fn executions_of(&self, step: &str) -> usize {
        self.executed_steps.iter().filter(|s| *s == step).count()
    }

    /// Serializes the result to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
