//! Step trait and implementations.
//!
//! Steps are the units of work the orchestrator sequences. A step takes the
//! whole [`PipelineState`] by value and hands it back together with a
//! [`StepOutcome`]; expected failures are reported as [`StepOutcome::Fail`],
//! never by panicking.

mod analyze;
mod copy;
mod image;
mod moderation;
mod publish;
mod research;
mod strategy;

pub use analyze::AnalyzeStep;
pub use copy::CopyStep;
pub use image::ImageStep;
pub use moderation::{parse_verdict, ModerationStep};
pub use publish::PublishStep;
pub use research::ResearchStep;
pub use strategy::StrategyStep;

use crate::state::PipelineState;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Whether the run may advance past a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step succeeded; follow the step's outgoing edge.
    Continue,
    /// The step failed with a reason; the run stops.
    Fail(String),
}

impl StepOutcome {
    /// Returns true if the outcome is [`StepOutcome::Continue`].
    #[must_use]
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    /// Returns the failure reason, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Continue => None,
            Self::Fail(reason) => Some(reason),
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Fail(reason) => write!(f, "fail: {reason}"),
        }
    }
}

/// The state returned by a step together with its outcome.
#[derive(Debug, Clone)]
pub struct StepOutput {
    /// The full next state.
    pub state: PipelineState,
    /// Whether the run may advance.
    pub outcome: StepOutcome,
}

impl StepOutput {
    /// Successful output. Clears any stale error marker.
    #[must_use]
    pub fn proceed(mut state: PipelineState) -> Self {
        state.error = None;
        Self {
            state,
            outcome: StepOutcome::Continue,
        }
    }

    /// Failed output. The reason is mirrored into `state.error`.
    #[must_use]
    pub fn fail(mut state: PipelineState, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        state.error = Some(reason.clone());
        Self {
            state,
            outcome: StepOutcome::Fail(reason),
        }
    }

    /// Returns true if the output lets the run advance.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_continue()
    }
}

/// Trait for pipeline steps.
///
/// Capabilities a step needs are injected when it is constructed; the
/// orchestrator only ever calls [`Step::execute`].
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Returns the name of the step.
    fn name(&self) -> &str;

    /// Executes the step against the current state.
    async fn execute(&self, state: PipelineState) -> StepOutput;
}

/// A simple function-based step.
pub struct FnStep<F>
where
    F: Fn(PipelineState) -> StepOutput + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnStep<F>
where
    F: Fn(PipelineState) -> StepOutput + Send + Sync,
{
    /// Creates a new function-based step.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnStep<F>
where
    F: Fn(PipelineState) -> StepOutput + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Step for FnStep<F>
where
    F: Fn(PipelineState) -> StepOutput + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, state: PipelineState) -> StepOutput {
        (self.func)(state)
    }
}

/// An async function-based step.
pub struct AsyncFnStep<F>
where
    F: Fn(PipelineState) -> BoxFuture<'static, StepOutput> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> AsyncFnStep<F>
where
    F: Fn(PipelineState) -> BoxFuture<'static, StepOutput> + Send + Sync,
{
    /// Creates a new async function-based step.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for AsyncFnStep<F>
where
    F: Fn(PipelineState) -> BoxFuture<'static, StepOutput> + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFnStep").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Step for AsyncFnStep<F>
where
    F: Fn(PipelineState) -> BoxFuture<'static, StepOutput> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, state: PipelineState) -> StepOutput {
        (self.func)(state).await
    }
}

/// A step that passes the state through unchanged.
#[derive(Debug, Clone)]
pub struct NoOpStep {
    name: String,
}

impl NoOpStep {
    /// Creates a new no-op step.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Step for NoOpStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, state: PipelineState) -> StepOutput {
        StepOutput::proceed(state)
    }
}
