//! Error types for the contentflow orchestrator.
//!
//! Graph defects surface as [`ConfigurationError`] before any step runs,
//! failures during a run surface as [`RunError`], and capability adapters
//! report [`CapabilityError`] which steps turn into a failed outcome.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The umbrella error type for contentflow operations.
#[derive(Debug, Error)]
pub enum ContentflowError {
    /// The step graph is structurally invalid.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// A pipeline run ended in failure.
    #[error("{0}")]
    Run(#[from] RunError),

    /// An external capability call failed.
    #[error("{0}")]
    Capability(#[from] CapabilityError),

    /// Settings could not be loaded or are invalid.
    #[error("{0}")]
    Settings(#[from] SettingsError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A structural defect in the step graph, detected at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// No entry step was set.
    #[error("Graph has no entry step")]
    MissingEntry,

    /// The entry step is not a registered step.
    #[error("Entry step '{0}' is not registered")]
    UnknownEntry(String),

    /// A step name was registered twice.
    #[error("Step '{0}' is registered more than once")]
    DuplicateStep(String),

    /// An edge references a step that was never registered.
    #[error("Edge '{from}' -> '{to}' references unknown step '{missing}'")]
    UnknownStep {
        /// Edge source.
        from: String,
        /// Edge target.
        to: String,
        /// The name that could not be resolved.
        missing: String,
    },

    /// A step has more than one outgoing edge definition.
    #[error("Step '{0}' has more than one outgoing edge definition")]
    ConflictingEdges(String),

    /// A conditional edge has an empty routing table.
    #[error("Conditional edge from '{0}' has no routes")]
    EmptyRoutes(String),

    /// A cycle exists that no conditional edge can bound.
    #[error("Unbounded cycle of unconditional edges: {}", .0.join(" -> "))]
    UnboundedCycle(Vec<String>),

    /// Steps unreachable from the entry (fatal only in strict mode).
    #[error("Unreachable steps: {}", .0.join(", "))]
    UnreachableSteps(Vec<String>),

    /// A run was asked to start at a step that does not exist.
    #[error("Cannot start run at unknown step '{0}'")]
    UnknownStartStep(String),
}

impl ConfigurationError {
    /// Stable error code for diagnostics.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingEntry => "GRAPH-MISSING-ENTRY",
            Self::UnknownEntry(_) => "GRAPH-UNKNOWN-ENTRY",
            Self::DuplicateStep(_) => "GRAPH-DUPLICATE-STEP",
            Self::UnknownStep { .. } => "GRAPH-UNKNOWN-STEP",
            Self::ConflictingEdges(_) => "GRAPH-CONFLICTING-EDGES",
            Self::EmptyRoutes(_) => "GRAPH-EMPTY-ROUTES",
            Self::UnboundedCycle(_) => "GRAPH-UNBOUNDED-CYCLE",
            Self::UnreachableSteps(_) => "GRAPH-UNREACHABLE",
            Self::UnknownStartStep(_) => "GRAPH-UNKNOWN-START",
        }
    }

    /// A hint for fixing the defect.
    #[must_use]
    pub fn fix_hint(&self) -> &'static str {
        match self {
            Self::MissingEntry | Self::UnknownEntry(_) => {
                "Call set_entry with the name of a registered step."
            }
            Self::DuplicateStep(_) => "Give every step a unique name.",
            Self::UnknownStep { .. } | Self::UnknownStartStep(_) => {
                "Check for typos in step names and register every edge target."
            }
            Self::ConflictingEdges(_) => {
                "Use a single conditional edge when a step needs more than one exit."
            }
            Self::EmptyRoutes(_) => "Add at least one route to the conditional edge.",
            Self::UnboundedCycle(_) => {
                "Break the cycle or route it through a conditional edge with a retry bound."
            }
            Self::UnreachableSteps(_) => {
                "Connect the steps to the graph, or disable strict mode to run them via run_from."
            }
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map.insert("fix_hint".to_string(), serde_json::json!(self.fix_hint()));
        map
    }
}

/// Why a run ended in the `Failed` state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunError {
    /// The graph or the requested start step is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Stable code of the underlying [`ConfigurationError`].
        code: String,
        /// Human readable message.
        message: String,
    },

    /// A step reported a failed outcome.
    #[error("Step '{step}' failed: {message}")]
    Step {
        /// The failing step.
        step: String,
        /// The captured failure reason.
        message: String,
    },

    /// A router produced a key missing from its routing table.
    #[error("Router after step '{step}' returned unknown key '{key}'")]
    Routing {
        /// The step whose conditional edge was evaluated.
        step: String,
        /// The unmatched key.
        key: String,
    },

    /// A back-edge was taken more often than its bound allows.
    #[error("Retry limit of {limit} exceeded on edge '{step}' -> '{target}'")]
    RetryLimitExceeded {
        /// Source of the back-edge.
        step: String,
        /// Target of the back-edge.
        target: String,
        /// The configured bound.
        limit: u32,
    },

    /// The run was cancelled between steps.
    #[error("Run cancelled: {reason}")]
    Cancelled {
        /// The cancellation reason.
        reason: String,
    },
}

impl RunError {
    /// Returns true for structural errors (bad graph or routing table).
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Routing { .. })
    }

    /// Returns the name of the step the error is attributed to, if any.
    #[must_use]
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::Step { step, .. }
            | Self::Routing { step, .. }
            | Self::RetryLimitExceeded { step, .. } => Some(step),
            Self::Configuration { .. } | Self::Cancelled { .. } => None,
        }
    }
}

impl From<ConfigurationError> for RunError {
    fn from(err: ConfigurationError) -> Self {
        Self::Configuration {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors reported by external capabilities (LLM, image generation, publishing).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// Credentials or endpoints for the capability are missing.
    #[error("{capability} is not configured: {reason}")]
    NotConfigured {
        /// The capability name.
        capability: String,
        /// What is missing.
        reason: String,
    },

    /// The outbound request failed.
    #[error("{capability} request failed: {reason}")]
    Request {
        /// The capability name.
        capability: String,
        /// The transport or status error.
        reason: String,
    },

    /// The remote side answered with something unusable.
    #[error("{capability} returned an invalid response: {reason}")]
    InvalidResponse {
        /// The capability name.
        capability: String,
        /// What was wrong with the response.
        reason: String,
    },

    /// The remote side refused the request.
    #[error("{capability} rejected the request: {reason}")]
    Rejected {
        /// The capability name.
        capability: String,
        /// The remote error message.
        reason: String,
    },
}

impl CapabilityError {
    /// Creates a not configured error.
    #[must_use]
    pub fn not_configured(capability: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotConfigured {
            capability: capability.into(),
            reason: reason.into(),
        }
    }

    /// Creates a request error.
    #[must_use]
    pub fn request(capability: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Request {
            capability: capability.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(capability: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            capability: capability.into(),
            reason: reason.into(),
        }
    }

    /// Creates a rejected error.
    #[must_use]
    pub fn rejected(capability: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            capability: capability.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading or validating [`crate::config::Settings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A value could not be parsed.
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue {
        /// The setting key.
        key: String,
        /// Why it is invalid.
        reason: String,
    },

    /// The settings file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid JSON for [`crate::config::Settings`].
    #[error("Malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SettingsError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_codes() {
        let err = ConfigurationError::UnknownStep {
            from: "a".to_string(),
            to: "b".to_string(),
            missing: "b".to_string(),
        };
        assert_eq!(err.code(), "GRAPH-UNKNOWN-STEP");
        assert!(err.to_string().contains("'b'"));

        let dict = err.to_dict();
        assert_eq!(dict.get("code").unwrap(), "GRAPH-UNKNOWN-STEP");
        assert!(dict.contains_key("fix_hint"));
    }

    #[test]
    fn test_unbounded_cycle_message() {
        let err = ConfigurationError::UnboundedCycle(vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
        ]);
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn test_run_error_from_configuration() {
        let err: RunError = ConfigurationError::MissingEntry.into();
        assert!(err.is_configuration());
        assert!(matches!(err, RunError::Configuration { ref code, .. } if code == "GRAPH-MISSING-ENTRY"));
    }

    #[test]
    fn test_run_error_step_attribution() {
        let err = RunError::Step {
            step: "copy".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(err.step(), Some("copy"));
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("boom"));

        let routing = RunError::Routing {
            step: "moderation".to_string(),
            key: "maybe".to_string(),
        };
        assert!(routing.is_configuration());
    }

    #[test]
    fn test_run_error_serialize() {
        let err = RunError::RetryLimitExceeded {
            step: "moderation".to_string(),
            target: "copy".to_string(),
            limit: 2,
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "retry_limit_exceeded");
        assert_eq!(json["limit"], 2);
    }

    #[test]
    fn test_capability_error_display() {
        let err = CapabilityError::not_configured("telegram", "missing bot token");
        assert_eq!(err.to_string(), "telegram is not configured: missing bot token");
    }
}
