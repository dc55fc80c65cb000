//! Graph execution.
//!
//! This module provides:
//! - The [`Orchestrator`] that runs a compiled graph
//! - Run status and result types
//! - The standard content-production graph

mod content;
mod orchestrator;
mod result;

pub use content::{content_graph, content_graph_from_settings, names, ContentSteps};
pub use orchestrator::Orchestrator;
pub use result::{RunResult, RunStatus};
