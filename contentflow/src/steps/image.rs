//! Image generation step.

use super::{Step, StepOutput};
use crate::capabilities::{ImageGenerator, ImageRequest};
use crate::state::PipelineState;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

const PROMPT_SOURCE_CHARS: usize = 200;

/// Generates an illustration for the post and appends it to `images`.
///
/// A generation failure leaves `images` empty and lets the run continue,
/// unless the step was built with [`ImageStep::required`].
pub struct ImageStep {
    images: Arc<dyn ImageGenerator>,
    required: bool,
}

impl ImageStep {
    /// Creates an optional image step.
    pub fn new(images: Arc<dyn ImageGenerator>) -> Self {
        Self {
            images,
            required: false,
        }
    }

    /// Makes a generation failure fail the run.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    fn prompt(state: &PipelineState) -> ImageRequest {
        let excerpt: String = state.content_text().chars().take(PROMPT_SOURCE_CHARS).collect();
        ImageRequest::new(format!(
            "Create a professional social media image for: {excerpt}. \
             Style: {}, modern, clean design suitable for social media.",
            state.style
        ))
    }
}

impl fmt::Debug for ImageStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageStep")
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for ImageStep {
    fn name(&self) -> &str {
        "image"
    }

    async fn execute(&self, mut state: PipelineState) -> StepOutput {
        if state.content.is_none() {
            return StepOutput::fail(state, "Image generation error: no content");
        }

        match self.images.generate_image(&Self::prompt(&state)).await {
            Ok(url) => {
                state.images = vec![url];
                StepOutput::proceed(state)
            }
            Err(e) if self.required => {
                StepOutput::fail(state, format!("Image generation error: {e}"))
            }
            Err(e) => {
                warn!(error = %e, "Image generation failed; continuing without image");
                state.images.clear();
                StepOutput::proceed(state)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::MockImageGenerator;
    use crate::errors::CapabilityError;
    use crate::state::{BusinessContext, Content, Platform};

    fn written() -> PipelineState {
        let mut state = PipelineState::new(BusinessContext::new("Acme", "Retail")).with_style("minimal");
        state.content = Some(Content {
            text: "x".repeat(500),
            variations: Vec::new(),
            platform: Platform::Telegram,
            theme: "general".to_string(),
        });
        state
    }

    fn failing() -> MockImageGenerator {
        let mut images = MockImageGenerator::new();
        images
            .expect_generate_image()
            .returning(|_| Err(CapabilityError::rejected("openai", "content policy")));
        images
    }

    #[tokio::test]
    async fn test_appends_image_url() {
        let mut images = MockImageGenerator::new();
        images
            .expect_generate_image()
            .withf(|req| req.prompt.contains("Style: minimal") && req.size == "1024x1024")
            .returning(|_| Ok("https://img/1.png".to_string()));

        let output = ImageStep::new(Arc::new(images)).execute(written()).await;
        assert!(output.is_success());
        assert_eq!(output.state.images, vec!["https://img/1.png".to_string()]);
    }

    #[test]
    fn test_prompt_truncates_content() {
        let prompt = ImageStep::prompt(&written()).prompt;
        assert!(prompt.contains(&"x".repeat(200)));
        assert!(!prompt.contains(&"x".repeat(201)));
    }

    #[tokio::test]
    async fn test_optional_failure_continues() {
        let output = ImageStep::new(Arc::new(failing())).execute(written()).await;
        assert!(output.is_success());
        assert!(output.state.images.is_empty());
        assert!(output.state.error.is_none());
    }

    #[tokio::test]
    async fn test_required_failure_fails() {
        let output = ImageStep::new(Arc::new(failing()))
            .required(true)
            .execute(written())
            .await;
        assert!(!output.is_success());
        assert!(output.outcome.failure().unwrap().contains("content policy"));
    }
}
