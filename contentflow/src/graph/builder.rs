//! Graph builder with validation.

use super::compiled::{ConditionalExit, Exit, Graph, Route};
use super::{ConditionalEdge, Edge, Router};
use crate::errors::ConfigurationError;
use crate::steps::Step;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::warn;

/// Collects steps and edges for a [`Graph`].
///
/// Registration never fails; every defect is reported by [`compile`](Self::compile).
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    steps: Vec<(String, Arc<dyn Step>)>,
    edges: Vec<(String, Edge)>,
    entry: Option<String>,
    entry_points: Vec<String>,
    strict: bool,
}

impl GraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a step under `name`.
    #[must_use]
    pub fn register_step(mut self, name: impl Into<String>, step: Arc<dyn Step>) -> Self {
        self.steps.push((name.into(), step));
        self
    }

    /// Adds an unconditional edge.
    #[must_use]
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), Edge::Direct(to.into())));
        self
    }

    /// Adds a routed edge with the default retry bound.
    #[must_use]
    pub fn add_conditional_edge<K, V>(
        self,
        from: impl Into<String>,
        router: Arc<dyn Router>,
        routes: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.add_conditional(from, ConditionalEdge::new(router).routes(routes))
    }

    /// Adds a fully specified routed edge.
    #[must_use]
    pub fn add_conditional(mut self, from: impl Into<String>, edge: ConditionalEdge) -> Self {
        self.edges.push((from.into(), Edge::Conditional(edge)));
        self
    }

    /// Sets the entry step.
    #[must_use]
    pub fn set_entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    /// Declares an additional step that runs are started at with
    /// [`Orchestrator::run_from`](crate::pipeline::Orchestrator::run_from).
    ///
    /// Steps reachable from an entry point are not reported as unreachable.
    #[must_use]
    pub fn add_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_points.push(name.into());
        self
    }

    /// Makes unreachable steps a compile error instead of a warning.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Validates the definition and produces an immutable [`Graph`].
    ///
    /// # Errors
    ///
    /// Returns the first structural defect found.
    pub fn compile(self) -> Result<Graph, ConfigurationError> {
        let entry = self.entry.clone().ok_or(ConfigurationError::MissingEntry)?;

        let mut steps: HashMap<String, Arc<dyn Step>> = HashMap::new();
        let mut order = Vec::with_capacity(self.steps.len());
        for (name, step) in &self.steps {
            if steps.insert(name.clone(), Arc::clone(step)).is_some() {
                return Err(ConfigurationError::DuplicateStep(name.clone()));
            }
            order.push(name.clone());
        }

        if !steps.contains_key(&entry) {
            return Err(ConfigurationError::UnknownEntry(entry));
        }
        if let Some(point) = self.entry_points.iter().find(|p| !steps.contains_key(*p)) {
            return Err(ConfigurationError::UnknownEntry(point.clone()));
        }

        let mut edges: HashMap<String, Edge> = HashMap::new();
        for (from, edge) in &self.edges {
            if let Edge::Conditional(c) = edge {
                if c.routes.is_empty() {
                    return Err(ConfigurationError::EmptyRoutes(from.clone()));
                }
            }
            for to in edge.targets() {
                for name in [from.as_str(), to] {
                    if !steps.contains_key(name) {
                        return Err(ConfigurationError::UnknownStep {
                            from: from.clone(),
                            to: to.to_string(),
                            missing: name.to_string(),
                        });
                    }
                }
            }
            if edges.insert(from.clone(), edge.clone()).is_some() {
                return Err(ConfigurationError::ConflictingEdges(from.clone()));
            }
        }

        if let Some(cycle) = detect_direct_cycle(&order, &edges) {
            return Err(ConfigurationError::UnboundedCycle(cycle));
        }

        let mut reachable = reachable_from(&entry, &edges);
        for point in &self.entry_points {
            reachable.extend(reachable_from(point, &edges));
        }
        let unreachable: Vec<String> = order
            .iter()
            .filter(|name| !reachable.contains(name.as_str()))
            .cloned()
            .collect();

        let mut warnings = Vec::new();
        if !unreachable.is_empty() {
            if self.strict {
                return Err(ConfigurationError::UnreachableSteps(unreachable));
            }
            let message = format!(
                "Steps not reachable from '{entry}': {}",
                unreachable.join(", ")
            );
            warn!(entry = %entry, unreachable = ?unreachable, "Graph has unreachable steps");
            warnings.push(message);
        }

        let exits = edges
            .iter()
            .map(|(from, edge)| {
                let exit = match edge {
                    Edge::Direct(to) => Exit::Direct(to.clone()),
                    Edge::Conditional(c) => Exit::Conditional(ConditionalExit {
                        router: Arc::clone(&c.router),
                        routes: c
                            .routes
                            .iter()
                            .map(|(key, target)| {
                                let back_edge = reachable_from(target, &edges).contains(from.as_str());
                                (
                                    key.clone(),
                                    Route {
                                        target: target.clone(),
                                        back_edge,
                                    },
                                )
                            })
                            .collect::<BTreeMap<_, _>>(),
                        max_retries: c.max_retries,
                    }),
                };
                (from.clone(), exit)
            })
            .collect();

        Ok(Graph {
            steps,
            order,
            entry,
            exits,
            warnings,
        })
    }
}

/// Steps reachable from `start`, including `start`.
fn reachable_from<'a>(start: &'a str, edges: &'a HashMap<String, Edge>) -> HashSet<&'a str> {
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        if let Some(edge) = edges.get(node) {
            for next in edge.targets() {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }
    seen
}

/// Finds a cycle made only of unconditional edges.
fn detect_direct_cycle(order: &[String], edges: &HashMap<String, Edge>) -> Option<Vec<String>> {
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for name in order {
        if !visited.contains(name.as_str()) {
            if let Some(cycle) = dfs_cycle(name, edges, &mut visited, &mut rec_stack, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

fn dfs_cycle<'a>(
    node: &'a str,
    edges: &'a HashMap<String, Edge>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(Edge::Direct(next)) = edges.get(node) {
        let next = next.as_str();
        if !visited.contains(next) {
            if let Some(cycle) = dfs_cycle(next, edges, visited, rec_stack, path) {
                return Some(cycle);
            }
        } else if rec_stack.contains(next) {
            let start = path.iter().position(|n| *n == next).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|n| (*n).to_string()).collect();
            cycle.push(next.to_string());
            return Some(cycle);
        }
    }

    path.pop();
    rec_stack.remove(node);
    None
}
