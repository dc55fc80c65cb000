//! # Contentflow
//!
//! A graph orchestrator for a multi-step content-production pipeline:
//! research → strategy → copy → image → moderation → publish, with
//! analytics run after publication.
//!
//! Contentflow provides:
//!
//! - **A typed run state**: one [`PipelineState`](state::PipelineState) record moved
//!   through the graph, with run-scoped fields the orchestrator keeps read-only
//! - **Validated graphs**: unknown steps, unbounded cycles and unreachable steps
//!   are reported before anything runs
//! - **Bounded retries**: a rejected draft goes back to copywriting at most
//!   `max_retries` times
//! - **Injected capabilities**: text generation, image generation, publishing
//!   and metrics are traits, with OpenAI, Telegram and VK adapters behind the
//!   `http` feature
//! - **Observability**: `tracing` spans per run and a pluggable event sink
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use contentflow::prelude::*;
//!
//! let settings = Settings::from_env()?;
//! let caps = Capabilities::from_settings(&settings)?;
//! let orchestrator = Orchestrator::from_builder(content_graph_from_settings(
//!     ContentSteps::from_capabilities(&caps),
//!     &settings.pipeline,
//! ))?;
//!
//! let state = PipelineState::new(BusinessContext::new("Acme", "Retail"));
//! let result = orchestrator.run(state).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod capabilities;
pub mod config;
pub mod errors;
pub mod events;
pub mod graph;
pub mod observability;
pub mod pipeline;
pub mod state;
pub mod steps;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::capabilities::{
        Capabilities, ImageGenerator, MetricsSource, PlatformPublisher, Publisher,
        TextGenerator,
    };
    pub use crate::config::Settings;
    pub use crate::errors::{
        CapabilityError, ConfigurationError, ContentflowError, RunError, SettingsError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RunEvent};
    pub use crate::graph::{ConditionalEdge, FnRouter, Graph, GraphBuilder, ModerationRouter, Router};
    pub use crate::pipeline::{
        content_graph, content_graph_from_settings, ContentSteps, Orchestrator, RunResult,
        RunStatus,
    };
    pub use crate::state::{BusinessContext, Platform, PipelineState, StateField};
    pub use crate::steps::{AsyncFnStep, FnStep, NoOpStep, Step, StepOutcome, StepOutput};
}
