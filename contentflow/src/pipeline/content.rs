//! The standard content-production graph.

use crate::capabilities::Capabilities;
use crate::config::PipelineSettings;
use crate::graph::{ConditionalEdge, GraphBuilder, ModerationRouter};
use crate::steps::{
    AnalyzeStep, CopyStep, ImageStep, ModerationStep, PublishStep, ResearchStep, Step,
    StrategyStep,
};
use std::sync::Arc;

/// Step names used by [`content_graph`].
pub mod names {
    /// Market research.
    pub const RESEARCH: &str = "research";
    /// Strategy.
    pub const STRATEGY: &str = "strategy";
    /// Copywriting.
    pub const COPY: &str = "copy";
    /// Image generation.
    pub const IMAGE: &str = "image";
    /// Moderation.
    pub const MODERATION: &str = "moderation";
    /// Publishing.
    pub const PUBLISH: &str = "publish";
    /// Analytics.
    pub const ANALYZE: &str = "analyze";
}

/// The seven steps of the content graph.
///
/// Fields are public so individual steps can be swapped, e.g. for stubs.
#[derive(Debug, Clone)]
pub struct ContentSteps {
    /// Research step.
    pub research: Arc<dyn Step>,
    /// Strategy step.
    pub strategy: Arc<dyn Step>,
    /// Copy step.
    pub copy: Arc<dyn Step>,
    /// Image step.
    pub image: Arc<dyn Step>,
    /// Moderation step.
    pub moderation: Arc<dyn Step>,
    /// Publish step.
    pub publish: Arc<dyn Step>,
    /// Analyze step.
    pub analyze: Arc<dyn Step>,
}

impl ContentSteps {
    /// Builds the concrete steps over a capability set.
    #[must_use]
    pub fn from_capabilities(caps: &Capabilities) -> Self {
        Self {
            research: Arc::new(ResearchStep::new(Arc::clone(&caps.text))),
            strategy: Arc::new(StrategyStep::new(Arc::clone(&caps.text))),
            copy: Arc::new(CopyStep::new(Arc::clone(&caps.text))),
            image: Arc::new(ImageStep::new(Arc::clone(&caps.images))),
            moderation: Arc::new(ModerationStep::new(Arc::clone(&caps.text))),
            publish: Arc::new(PublishStep::new(Arc::clone(&caps.publisher))),
            analyze: Arc::new(AnalyzeStep::new(
                Arc::clone(&caps.metrics),
                Arc::clone(&caps.text),
            )),
        }
    }

    /// Replaces the image step with one that fails the run on error.
    #[must_use]
    pub fn with_required_image(mut self, caps: &Capabilities) -> Self {
        self.image = Arc::new(ImageStep::new(Arc::clone(&caps.images)).required(true));
        self
    }
}

/// Wires research → strategy → copy → image → moderation, then routes
/// `approved` to publish and `rejected` back to copy at most `max_retries`
/// times.
///
/// Publish is terminal. Analyze has no incoming edge and is declared as an
/// entry point; run it after publication with
/// [`Orchestrator::run_from`](super::Orchestrator::run_from).
#[must_use]
pub fn content_graph(steps: ContentSteps, max_retries: u32) -> GraphBuilder {
    use names::{ANALYZE, COPY, IMAGE, MODERATION, PUBLISH, RESEARCH, STRATEGY};

    GraphBuilder::new()
        .register_step(RESEARCH, steps.research)
        .register_step(STRATEGY, steps.strategy)
        .register_step(COPY, steps.copy)
        .register_step(IMAGE, steps.image)
        .register_step(MODERATION, steps.moderation)
        .register_step(PUBLISH, steps.publish)
        .register_step(ANALYZE, steps.analyze)
        .add_edge(RESEARCH, STRATEGY)
        .add_edge(STRATEGY, COPY)
        .add_edge(COPY, IMAGE)
        .add_edge(IMAGE, MODERATION)
        .add_conditional(
            MODERATION,
            ConditionalEdge::new(Arc::new(ModerationRouter))
                .route(ModerationRouter::APPROVED, PUBLISH)
                .route(ModerationRouter::REJECTED, COPY)
                .max_retries(max_retries),
        )
        .set_entry(RESEARCH)
        .add_entry_point(ANALYZE)
}

/// [`content_graph`] with the retry bound and strictness from settings.
#[must_use]
pub fn content_graph_from_settings(steps: ContentSteps, settings: &PipelineSettings) -> GraphBuilder {
    content_graph(steps, settings.max_retries).strict(settings.strict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::stub_content_steps;

    #[test]
    fn test_content_graph_compiles() {
        let graph = content_graph(stub_content_steps(true), 3).compile().unwrap();

        assert_eq!(graph.entry(), "research");
        assert_eq!(graph.step_names().len(), 7);
        assert!(graph.is_terminal("publish"));
        assert!(graph.is_terminal("analyze"));
        assert_eq!(
            graph.back_edges(),
            vec![("moderation".to_string(), "rejected".to_string())]
        );
        assert!(graph.warnings().is_empty());
    }

    #[test]
    fn test_settings_apply_strictness_and_bound() {
        let strict = PipelineSettings {
            max_retries: 1,
            strict: true,
        };
        let graph = content_graph_from_settings(stub_content_steps(true), &strict)
            .compile()
            .unwrap();
        let Some(crate::graph::Exit::Conditional(exit)) = graph.exit("moderation") else {
            panic!("expected conditional exit");
        };
        assert_eq!(exit.max_retries(), 1);

        let orphan = || Arc::new(crate::steps::NoOpStep::new("orphan"));
        let err = content_graph_from_settings(stub_content_steps(true), &strict)
            .register_step("orphan", orphan())
            .compile()
            .unwrap_err();
        assert_eq!(err.code(), "GRAPH-UNREACHABLE");

        let lenient = PipelineSettings::default();
        let graph = content_graph_from_settings(stub_content_steps(true), &lenient)
            .register_step("orphan", orphan())
            .compile()
            .unwrap();
        assert_eq!(graph.warnings().len(), 1);
    }
}
