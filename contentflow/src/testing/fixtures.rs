//! Fixtures for pipeline tests.

use std::sync::Arc;

use crate::capabilities::{Capabilities, StaticMetricsSource};
use crate::pipeline::ContentSteps;
use crate::state::{
    Analytics, BusinessContext, Content, Platform, PipelineState, PublishReceipt, ResearchData,
    Strategy,
};
use crate::steps::{FnStep, StepOutput};

use super::{RecordingPublisher, ScriptedModerationStep, StubImageGenerator, StubTextGenerator};

/// Acme / Retail on Telegram.
#[must_use]
pub fn sample_state() -> PipelineState {
    PipelineState::new(BusinessContext::new("Acme", "Retail")).with_platform(Platform::Telegram)
}

/// Stub content steps that write plausible values without capabilities.
///
/// Moderation always approves or always rejects according to `approve`.
#[must_use]
pub fn stub_content_steps(approve: bool) -> ContentSteps {
    ContentSteps {
        research: Arc::new(FnStep::new("research", |mut s: PipelineState| {
            s.research_data = Some(ResearchData {
                market_trends: "stub trends".to_string(),
                ..ResearchData::default()
            });
            StepOutput::proceed(s)
        })),
        strategy: Arc::new(FnStep::new("strategy", |mut s: PipelineState| {
            s.strategy = Some(Strategy::with_goals("stub goals"));
            StepOutput::proceed(s)
        })),
        copy: Arc::new(FnStep::new("copy", |mut s: PipelineState| {
            s.content = Some(Content {
                text: format!("Post for {}", s.business_context.name),
                variations: Vec::new(),
                platform: s.platform,
                theme: s.theme.clone(),
            });
            StepOutput::proceed(s)
        })),
        image: Arc::new(FnStep::new("image", |mut s: PipelineState| {
            s.images = vec!["https://img.example/stub.png".to_string()];
            StepOutput::proceed(s)
        })),
        moderation: Arc::new(if approve {
            ScriptedModerationStep::approving()
        } else {
            ScriptedModerationStep::rejecting()
        }),
        publish: Arc::new(FnStep::new("publish", |mut s: PipelineState| {
            s.published = s.approved;
            if s.approved {
                s.publication = Some(PublishReceipt {
                    post_id: "1".to_string(),
                    platform: s.platform,
                });
            }
            StepOutput::proceed(s)
        })),
        analyze: Arc::new(FnStep::new("analyze", |mut s: PipelineState| {
            s.analytics = Some(Analytics::default());
            StepOutput::proceed(s)
        })),
    }
}

/// Capabilities backed by in-memory stubs.
///
/// The text generator answers every prompt with `reply`; pass a moderation
/// verdict such as `"STATUS: APPROVED"` to drive the moderation step.
#[must_use]
pub fn stub_capabilities(reply: &str) -> (Capabilities, Arc<RecordingPublisher>) {
    let publisher = Arc::new(RecordingPublisher::new());
    let caps = Capabilities::new(
        Arc::new(StubTextGenerator::new(reply)),
        Arc::new(StubImageGenerator::new("https://img.example/1.png")),
        publisher.clone(),
        Arc::new(StaticMetricsSource::default()),
    );
    (caps, publisher)
}
