//! Routers pick the outgoing route of a conditional edge.

use crate::state::PipelineState;
use std::fmt;

/// Maps the post-step state to a route key.
///
/// Routers must be pure: the same state always yields the same key.
pub trait Router: Send + Sync + fmt::Debug {
    /// Returns the route key for `state`.
    fn route(&self, state: &PipelineState) -> String;
}

/// Routes on the moderation verdict.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModerationRouter;

impl ModerationRouter {
    /// Key returned when the content was approved.
    pub const APPROVED: &'static str = "approved";
    /// Key returned when the content was rejected.
    pub const REJECTED: &'static str = "rejected";
}

impl Router for ModerationRouter {
    fn route(&self, state: &PipelineState) -> String {
        if state.approved {
            Self::APPROVED.to_string()
        } else {
            Self::REJECTED.to_string()
        }
    }
}

/// A router backed by a closure.
pub struct FnRouter<F>
where
    F: Fn(&PipelineState) -> String + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnRouter<F>
where
    F: Fn(&PipelineState) -> String + Send + Sync,
{
    /// Creates a named closure router.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> fmt::Debug for FnRouter<F>
where
    F: Fn(&PipelineState) -> String + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRouter").field("name", &self.name).finish()
    }
}

impl<F> Router for FnRouter<F>
where
    F: Fn(&PipelineState) -> String + Send + Sync,
{
    fn route(&self, state: &PipelineState) -> String {
        (self.func)(state)
    }
}
