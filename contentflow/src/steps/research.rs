//! Market research step.

use super::{Step, StepOutput};
use crate::capabilities::{TextGenerator, TextRequest};
use crate::state::{PipelineState, ResearchData};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const SYSTEM_PROMPT: &str =
    "You are an expert market researcher specializing in social media trends and competitor analysis.";

/// Researches market trends for the business and writes `research_data`.
pub struct ResearchStep {
    text: Arc<dyn TextGenerator>,
}

impl ResearchStep {
    /// Creates the step over a text generator.
    pub fn new(text: Arc<dyn TextGenerator>) -> Self {
        Self { text }
    }

    fn prompt(state: &PipelineState) -> TextRequest {
        let ctx = &state.business_context;
        let audience = if ctx.target_audience.is_empty() {
            "General audience"
        } else {
            &ctx.target_audience
        };
        TextRequest::new(
            SYSTEM_PROMPT,
            format!(
                "Research and analyze the market for the following business:\n\n\
                 Company: {}\nIndustry: {}\nTarget Audience: {}\n\n\
                 Provide a comprehensive analysis including:\n\
                 1. Current market trends in this industry\n\
                 2. Competitor analysis (top 3-5 competitors)\n\
                 3. Target audience insights and preferences\n\
                 4. Content opportunities and gaps\n\
                 5. Recommended content themes\n\n\
                 Format your response as structured data with clear sections.",
                ctx.name, ctx.industry, audience
            ),
        )
    }
}

impl fmt::Debug for ResearchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResearchStep").finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for ResearchStep {
    fn name(&self) -> &str {
        "research"
    }

    async fn execute(&self, mut state: PipelineState) -> StepOutput {
        debug!(business = %state.business_context.name, "Researching market");
        match self.text.generate(&Self::prompt(&state)).await {
            Ok(analysis) => {
                state.research_data = Some(ResearchData {
                    market_trends: analysis,
                    ..ResearchData::default()
                });
                StepOutput::proceed(state)
            }
            Err(e) => StepOutput::fail(state, format!("Research error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::MockTextGenerator;
    use crate::errors::CapabilityError;
    use crate::state::BusinessContext;

    fn state() -> PipelineState {
        PipelineState::new(BusinessContext::new("Acme", "Retail"))
    }

    #[tokio::test]
    async fn test_writes_research_data() {
        let mut text = MockTextGenerator::new();
        text.expect_generate()
            .withf(|req| req.user.contains("Company: Acme") && req.user.contains("General audience"))
            .times(1)
            .returning(|_| Ok("Retail is going omnichannel".to_string()));

        let output = ResearchStep::new(Arc::new(text)).execute(state()).await;
        assert!(output.is_success());
        let research = output.state.research_data.unwrap();
        assert_eq!(research.market_trends, "Retail is going omnichannel");
        assert!(research.competitor_analysis.is_empty());
    }

    #[tokio::test]
    async fn test_capability_error_fails() {
        let mut text = MockTextGenerator::new();
        text.expect_generate()
            .returning(|_| Err(CapabilityError::request("openai", "timeout")));

        let output = ResearchStep::new(Arc::new(text)).execute(state()).await;
        assert!(!output.is_success());
        assert!(output.outcome.failure().unwrap().contains("timeout"));
        assert!(output.state.research_data.is_none());
    }
}
