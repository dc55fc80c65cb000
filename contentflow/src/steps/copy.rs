//! Copywriting step.
//!
//! On a rewrite (moderation sent the run back) the previous verdict's
//! suggestions are folded into the prompt.

use super::{Step, StepOutput};
use crate::capabilities::{TextGenerator, TextRequest};
use crate::state::{Content, PipelineState};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const SYSTEM_PROMPT: &str =
    "You are an expert social media copywriter who creates engaging, platform-optimized content.";

const VARIATION_SUFFIXES: [&str; 2] = ["\n\nWhat do you think?", "\n\nShare your thoughts below!"];

/// Writes the post copy into `content`.
pub struct CopyStep {
    text: Arc<dyn TextGenerator>,
}

impl CopyStep {
    /// Creates the step over a text generator.
    pub fn new(text: Arc<dyn TextGenerator>) -> Self {
        Self { text }
    }

    fn prompt(state: &PipelineState, goals: &str) -> TextRequest {
        let mut user = format!(
            "Write a social media post for {} platform.\n\n\
             Theme: {}\nStrategy Context: {}\n\n\
             Requirements:\n\
             - Platform-optimized (consider character limits and audience)\n\
             - Engaging and valuable\n\
             - Include a call-to-action\n\
             - Use appropriate tone for the platform\n\n\
             Generate the main post text and 2 alternative variations for A/B testing.",
            state.platform, state.theme, goals
        );

        if let Some(verdict) = state.moderation_result.as_ref().filter(|v| !v.approved) {
            let feedback = if verdict.suggestions.is_empty() {
                &verdict.reason
            } else {
                &verdict.suggestions
            };
            user.push_str("\n\nThe previous draft was rejected by moderation. Address this feedback:\n");
            user.push_str(feedback);
        }

        TextRequest::new(SYSTEM_PROMPT, user)
    }
}

impl fmt::Debug for CopyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyStep").finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for CopyStep {
    fn name(&self) -> &str {
        "copy"
    }

    async fn execute(&self, mut state: PipelineState) -> StepOutput {
        let Some(strategy) = state.strategy.as_ref() else {
            return StepOutput::fail(state, "Copywriting error: no strategy");
        };

        let rewrite = state.moderation_result.is_some();
        debug!(platform = %state.platform, theme = %state.theme, rewrite, "Writing copy");

        match self.text.generate(&Self::prompt(&state, &strategy.goals)).await {
            Ok(text) => {
                let mut variations = vec![text.clone()];
                variations.extend(VARIATION_SUFFIXES.iter().map(|s| format!("{text}{s}")));
                state.content = Some(Content {
                    text,
                    variations,
                    platform: state.platform,
                    theme: state.theme.clone(),
                });
                StepOutput::proceed(state)
            }
            Err(e) => StepOutput::fail(state, format!("Copywriting error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::MockTextGenerator;
    use crate::state::{BusinessContext, ModerationResult, Platform, Strategy};

    fn planned() -> PipelineState {
        let mut state = PipelineState::new(BusinessContext::new("Acme", "Retail"))
            .with_platform(Platform::Vk)
            .with_theme("spring sale");
        state.strategy = Some(Strategy::with_goals("Drive store visits"));
        state
    }

    #[tokio::test]
    async fn test_writes_content_with_variations() {
        let mut text = MockTextGenerator::new();
        text.expect_generate()
            .withf(|req| {
                req.user.contains("for vk platform")
                    && req.user.contains("Theme: spring sale")
                    && !req.user.contains("rejected")
            })
            .returning(|_| Ok("Spring is here!".to_string()));

        let output = CopyStep::new(Arc::new(text)).execute(planned()).await;
        assert!(output.is_success());
        let content = output.state.content.unwrap();
        assert_eq!(content.text, "Spring is here!");
        assert_eq!(content.variations.len(), 3);
        assert_eq!(content.variations[0], "Spring is here!");
        assert!(content.variations[2].ends_with("Share your thoughts below!"));
        assert_eq!(content.platform, Platform::Vk);
        assert_eq!(content.theme, "spring sale");
    }

    #[tokio::test]
    async fn test_rewrite_includes_moderation_feedback() {
        let mut state = planned();
        state.moderation_result = Some(ModerationResult {
            approved: false,
            reason: "Too pushy".to_string(),
            suggestions: "Soften the call-to-action".to_string(),
        });

        let mut text = MockTextGenerator::new();
        text.expect_generate()
            .withf(|req| req.user.contains("Soften the call-to-action"))
            .times(1)
            .returning(|_| Ok("Take a look at our spring picks".to_string()));

        let output = CopyStep::new(Arc::new(text)).execute(state).await;
        assert!(output.is_success());
    }

    #[tokio::test]
    async fn test_missing_strategy_fails() {
        let mut text = MockTextGenerator::new();
        text.expect_generate().never();

        let state = PipelineState::new(BusinessContext::new("Acme", "Retail"));
        let output = CopyStep::new(Arc::new(text)).execute(state).await;
        assert!(!output.is_success());
        assert!(output.state.content.is_none());
    }
}
