//! The validated, immutable step graph.

use super::Router;
use crate::steps::Step;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// One resolved route of a conditional exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Step the route leads to.
    pub target: String,
    /// True when `target` can reach the routing step again.
    pub back_edge: bool,
}

/// A compiled conditional exit.
#[derive(Debug, Clone)]
pub struct ConditionalExit {
    pub(crate) router: Arc<dyn Router>,
    pub(crate) routes: BTreeMap<String, Route>,
    pub(crate) max_retries: u32,
}

impl ConditionalExit {
    /// Looks up the route for a router key.
    #[must_use]
    pub fn route(&self, key: &str) -> Option<&Route> {
        self.routes.get(key)
    }

    /// Returns the router.
    #[must_use]
    pub fn router(&self) -> &dyn Router {
        self.router.as_ref()
    }

    /// Returns the retry bound for back-edge routes.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// How the orchestrator leaves a step.
#[derive(Debug, Clone)]
pub enum Exit {
    /// Unconditional edge.
    Direct(String),
    /// Routed edge.
    Conditional(ConditionalExit),
}

/// A graph that passed validation.
///
/// Built by [`GraphBuilder::compile`](super::GraphBuilder::compile); it is
/// immutable and may be shared between concurrent runs.
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) steps: HashMap<String, Arc<dyn Step>>,
    pub(crate) order: Vec<String>,
    pub(crate) entry: String,
    pub(crate) exits: HashMap<String, Exit>,
    pub(crate) warnings: Vec<String>,
}

impl Graph {
    /// Returns the entry step name.
    #[must_use]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Returns step names in registration order.
    #[must_use]
    pub fn step_names(&self) -> &[String] {
        &self.order
    }

    /// Returns true if a step is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Returns the step registered under `name`.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&Arc<dyn Step>> {
        self.steps.get(name)
    }

    /// Returns the exit of a step, or `None` for terminal steps.
    #[must_use]
    pub fn exit(&self, name: &str) -> Option<&Exit> {
        self.exits.get(name)
    }

    /// Returns true if the step has no outgoing edge.
    #[must_use]
    pub fn is_terminal(&self, name: &str) -> bool {
        self.contains(name) && !self.exits.contains_key(name)
    }

    /// Returns `(from, key)` pairs of every bounded retry route.
    #[must_use]
    pub fn back_edges(&self) -> Vec<(String, String)> {
        let mut edges: Vec<_> = self
            .exits
            .iter()
            .filter_map(|(from, exit)| match exit {
                Exit::Conditional(c) => Some(
                    c.routes
                        .iter()
                        .filter(|(_, r)| r.back_edge)
                        .map(|(key, _)| (from.clone(), key.clone()))
                        .collect::<Vec<_>>(),
                ),
                Exit::Direct(_) => None,
            })
            .flatten()
            .collect();
        edges.sort();
        edges
    }

    /// Returns validation warnings, such as unreachable steps.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}
