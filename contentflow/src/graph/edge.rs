//! Edge definitions.

use super::Router;
use crate::config::DEFAULT_MAX_RETRIES;
use std::collections::BTreeMap;
use std::sync::Arc;

/// An outgoing edge definition as registered on the builder.
#[derive(Debug, Clone)]
pub enum Edge {
    /// Always continue to the named step.
    Direct(String),
    /// Continue to the step selected by a router.
    Conditional(ConditionalEdge),
}

impl Edge {
    /// All step names the edge may lead to.
    #[must_use]
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Self::Direct(to) => vec![to.as_str()],
            Self::Conditional(edge) => edge.routes.values().map(String::as_str).collect(),
        }
    }
}

/// A routed edge: `key -> step` table plus the bound on retry routes.
#[derive(Debug, Clone)]
pub struct ConditionalEdge {
    pub(crate) router: Arc<dyn Router>,
    pub(crate) routes: BTreeMap<String, String>,
    pub(crate) max_retries: u32,
}

impl ConditionalEdge {
    /// Creates an edge with an empty routing table.
    pub fn new(router: Arc<dyn Router>) -> Self {
        Self {
            router,
            routes: BTreeMap::new(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Adds a route.
    #[must_use]
    pub fn route(mut self, key: impl Into<String>, target: impl Into<String>) -> Self {
        self.routes.insert(key.into(), target.into());
        self
    }

    /// Adds several routes.
    #[must_use]
    pub fn routes<K, V>(mut self, routes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.routes
            .extend(routes.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets how many times a retry route may be taken in one run.
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Returns the retry bound.
    #[must_use]
    pub fn retry_limit(&self) -> u32 {
        self.max_retries
    }

    /// Returns the routing table.
    #[must_use]
    pub fn route_table(&self) -> &BTreeMap<String, String> {
        &self.routes
    }
}
