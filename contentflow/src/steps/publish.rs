//! Publishing step.

use super::{Step, StepOutput};
use crate::capabilities::{PublishRequest, Publisher};
use crate::state::PipelineState;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Publishes approved content and writes `published` and `publication`.
///
/// Content that was not approved is not published; the step still
/// continues so the run can reach its terminal step.
pub struct PublishStep {
    publisher: Arc<dyn Publisher>,
}

impl PublishStep {
    /// Creates the step over a publisher.
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }
}

impl fmt::Debug for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishStep").finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for PublishStep {
    fn name(&self) -> &str {
        "publish"
    }

    async fn execute(&self, mut state: PipelineState) -> StepOutput {
        if !state.approved {
            warn!("Content not approved; skipping publication");
            state.published = false;
            return StepOutput::proceed(state);
        }

        let Some(content) = state.content.as_ref() else {
            return StepOutput::fail(state, "Publishing error: no content");
        };

        let request = PublishRequest {
            platform: state.platform,
            text: content.text.clone(),
            images: state.images.clone(),
            scheduled_time: state.scheduled_time,
        };

        match self.publisher.publish(&request).await {
            Ok(receipt) => {
                info!(platform = %receipt.platform, post_id = %receipt.post_id, "Content published");
                state.published = true;
                state.publication = Some(receipt);
                StepOutput::proceed(state)
            }
            Err(e) => {
                state.published = false;
                StepOutput::fail(state, format!("Publishing error: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::MockPublisher;
    use crate::errors::CapabilityError;
    use crate::state::{BusinessContext, Content, Platform, PublishReceipt};

    fn moderated(approved: bool) -> PipelineState {
        let mut state = PipelineState::new(BusinessContext::new("Acme", "Retail"));
        state.content = Some(Content {
            text: "Spring is here!".to_string(),
            variations: Vec::new(),
            platform: Platform::Telegram,
            theme: "general".to_string(),
        });
        state.images = vec!["https://img/1.png".to_string()];
        state.approved = approved;
        state
    }

    #[tokio::test]
    async fn test_publishes_approved_content() {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .withf(|req| {
                req.platform == Platform::Telegram
                    && req.text == "Spring is here!"
                    && req.images.len() == 1
            })
            .times(1)
            .returning(|_| {
                Ok(PublishReceipt {
                    post_id: "42".to_string(),
                    platform: Platform::Telegram,
                })
            });

        let output = PublishStep::new(Arc::new(publisher)).execute(moderated(true)).await;
        assert!(output.is_success());
        assert!(output.state.published);
        assert_eq!(output.state.publication.unwrap().post_id, "42");
    }

    #[tokio::test]
    async fn test_unapproved_content_is_not_published() {
        let mut publisher = MockPublisher::new();
        publisher.expect_publish().never();

        let output = PublishStep::new(Arc::new(publisher)).execute(moderated(false)).await;
        assert!(output.is_success());
        assert!(!output.state.published);
        assert!(output.state.publication.is_none());
    }

    #[tokio::test]
    async fn test_publisher_error_fails() {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .returning(|_| Err(CapabilityError::rejected("telegram", "chat not found")));

        let output = PublishStep::new(Arc::new(publisher)).execute(moderated(true)).await;
        assert!(!output.is_success());
        assert!(!output.state.published);
        assert!(output.outcome.failure().unwrap().contains("chat not found"));
    }
}
