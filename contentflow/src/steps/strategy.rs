//! Content strategy step.

use super::{Step, StepOutput};
use crate::capabilities::{TextGenerator, TextRequest};
use crate::state::{PipelineState, Strategy};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are an expert social media marketing strategist.";

/// Turns research into a posting strategy and writes `strategy`.
pub struct StrategyStep {
    text: Arc<dyn TextGenerator>,
}

impl StrategyStep {
    /// Creates the step over a text generator.
    pub fn new(text: Arc<dyn TextGenerator>) -> Self {
        Self { text }
    }
}

impl fmt::Debug for StrategyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyStep").finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for StrategyStep {
    fn name(&self) -> &str {
        "strategy"
    }

    async fn execute(&self, mut state: PipelineState) -> StepOutput {
        let Some(research) = state.research_data.as_ref() else {
            return StepOutput::fail(state, "Strategy error: no research data");
        };

        let request = TextRequest::new(
            SYSTEM_PROMPT,
            format!(
                "Based on this market research:\n\n{}\n\n\
                 Create a comprehensive social media content strategy including:\n\
                 1. SMM goals and objectives\n\
                 2. Content themes (5-7 themes)\n\
                 3. Posting schedule (optimal times and frequency)\n\
                 4. Target metrics and KPIs\n\
                 5. Content mix recommendations\n\n\
                 Format as structured strategy with actionable recommendations.",
                research.market_trends
            ),
        );

        match self.text.generate(&request).await {
            Ok(goals) => {
                state.strategy = Some(Strategy::with_goals(goals));
                StepOutput::proceed(state)
            }
            Err(e) => StepOutput::fail(state, format!("Strategy error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::MockTextGenerator;
    use crate::state::{BusinessContext, ResearchData};

    fn researched() -> PipelineState {
        let mut state = PipelineState::new(BusinessContext::new("Acme", "Retail"));
        state.research_data = Some(ResearchData {
            market_trends: "short video wins".to_string(),
            ..ResearchData::default()
        });
        state
    }

    #[tokio::test]
    async fn test_builds_strategy_from_research() {
        let mut text = MockTextGenerator::new();
        text.expect_generate()
            .withf(|req| req.user.contains("short video wins"))
            .returning(|_| Ok("Grow reach by 20%".to_string()));

        let output = StrategyStep::new(Arc::new(text)).execute(researched()).await;
        assert!(output.is_success());
        let strategy = output.state.strategy.unwrap();
        assert_eq!(strategy.goals, "Grow reach by 20%");
        assert_eq!(strategy.themes.len(), Strategy::DEFAULT_THEMES.len());
        assert_eq!(strategy.posting_schedule.optimal_times, vec!["09:00", "13:00", "18:00"]);
    }

    #[tokio::test]
    async fn test_missing_research_fails_without_calling_model() {
        let mut text = MockTextGenerator::new();
        text.expect_generate().never();

        let state = PipelineState::new(BusinessContext::new("Acme", "Retail"));
        let output = StrategyStep::new(Arc::new(text)).execute(state).await;
        assert_eq!(output.outcome.failure(), Some("Strategy error: no research data"));
    }
}
