//! Stub steps and capabilities for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::capabilities::{
    ImageGenerator, ImageRequest, PublishRequest, Publisher, TextGenerator, TextRequest,
};
use crate::errors::CapabilityError;
use crate::state::{ModerationResult, PipelineState, PublishReceipt};
use crate::steps::{Step, StepOutcome, StepOutput};

/// Shared, ordered log of executed step names.
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

/// A step that passes the state through with a configurable outcome.
#[derive(Debug)]
pub struct MockStep {
    name: String,
    outcome: Mutex<StepOutcome>,
    call_count: Mutex<usize>,
}

impl MockStep {
    /// Creates a mock step that continues.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: Mutex::new(StepOutcome::Continue),
            call_count: Mutex::new(0),
        }
    }

    /// Sets the outcome returned by later calls.
    pub fn set_outcome(&self, outcome: StepOutcome) {
        *self.outcome.lock() = outcome;
    }

    /// Returns the number of times the step ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl Step for MockStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, state: PipelineState) -> StepOutput {
        *self.call_count.lock() += 1;
        match self.outcome.lock().clone() {
            StepOutcome::Continue => StepOutput::proceed(state),
            StepOutcome::Fail(reason) => StepOutput::fail(state, reason),
        }
    }
}

/// Appends its name to a shared log, then delegates to an inner step.
#[derive(Debug)]
pub struct RecordingStep {
    name: String,
    inner: Arc<dyn Step>,
    log: ExecutionLog,
}

impl RecordingStep {
    /// Wraps `inner`, recording under the inner step's name.
    #[must_use]
    pub fn wrap(inner: Arc<dyn Step>, log: ExecutionLog) -> Self {
        Self {
            name: inner.name().to_string(),
            inner,
            log,
        }
    }
}

#[async_trait]
impl Step for RecordingStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, state: PipelineState) -> StepOutput {
        self.log.lock().push(self.name.clone());
        self.inner.execute(state).await
    }
}

/// A step that always fails with the given reason.
#[derive(Debug)]
pub struct FailingStep {
    name: String,
    reason: String,
}

impl FailingStep {
    /// Creates a failing step.
    #[must_use]
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Step for FailingStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, state: PipelineState) -> StepOutput {
        StepOutput::fail(state, self.reason.clone())
    }
}

/// Moderation stub that plays back a script of verdicts.
///
/// The last verdict repeats once the script runs out.
#[derive(Debug)]
pub struct ScriptedModerationStep {
    verdicts: Mutex<VecDeque<bool>>,
    last: Mutex<bool>,
}

impl ScriptedModerationStep {
    /// Creates a step returning `verdicts` in order.
    #[must_use]
    pub fn new(verdicts: impl IntoIterator<Item = bool>) -> Self {
        Self {
            verdicts: Mutex::new(verdicts.into_iter().collect()),
            last: Mutex::new(false),
        }
    }

    /// Always approves.
    #[must_use]
    pub fn approving() -> Self {
        Self::new([true])
    }

    /// Always rejects.
    #[must_use]
    pub fn rejecting() -> Self {
        Self::new([false])
    }

    fn next_verdict(&self) -> bool {
        let mut last = self.last.lock();
        if let Some(v) = self.verdicts.lock().pop_front() {
            *last = v;
        }
        *last
    }
}

#[async_trait]
impl Step for ScriptedModerationStep {
    fn name(&self) -> &str {
        "moderation"
    }

    async fn execute(&self, mut state: PipelineState) -> StepOutput {
        let approved = self.next_verdict();
        state.approved = approved;
        state.moderation_result = Some(ModerationResult {
            approved,
            reason: if approved { "ok" } else { "off brand" }.to_string(),
            suggestions: if approved { "" } else { "rewrite" }.to_string(),
        });
        StepOutput::proceed(state)
    }
}

/// Text generator returning scripted replies, then a default reply.
#[derive(Debug)]
pub struct StubTextGenerator {
    replies: Mutex<VecDeque<Result<String, CapabilityError>>>,
    default_reply: String,
    requests: Mutex<Vec<TextRequest>>,
}

impl StubTextGenerator {
    /// Creates a generator that always answers `reply`.
    #[must_use]
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: reply.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a reply ahead of the default.
    #[must_use]
    pub fn then(self, reply: Result<String, CapabilityError>) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    /// Returns every request received.
    #[must_use]
    pub fn requests(&self) -> Vec<TextRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for StubTextGenerator {
    async fn generate(&self, request: &TextRequest) -> Result<String, CapabilityError> {
        self.requests.lock().push(request.clone());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_reply.clone()))
    }
}

/// Image generator returning a fixed URL, or failing.
#[derive(Debug, Clone)]
pub struct StubImageGenerator {
    result: Result<String, CapabilityError>,
}

impl StubImageGenerator {
    /// Always returns `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { result: Ok(url.into()) }
    }

    /// Always fails.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            result: Err(CapabilityError::request("images", reason)),
        }
    }
}

#[async_trait]
impl ImageGenerator for StubImageGenerator {
    async fn generate_image(&self, _request: &ImageRequest) -> Result<String, CapabilityError> {
        self.result.clone()
    }
}

/// Publisher that records requests and returns sequential post ids.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<PublishRequest>>,
}

impl RecordingPublisher {
    /// Creates an empty publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every published request.
    #[must_use]
    pub fn published(&self) -> Vec<PublishRequest> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt, CapabilityError> {
        let mut published = self.published.lock();
        published.push(request.clone());
        Ok(PublishReceipt {
            post_id: published.len().to_string(),
            platform: request.platform,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_state;

    #[tokio::test]
    async fn test_mock_step_outcome() {
        let step = MockStep::new("m");
        assert!(step.execute(sample_state()).await.is_success());

        step.set_outcome(StepOutcome::Fail("nope".to_string()));
        let output = step.execute(sample_state()).await;
        assert_eq!(output.state.error.as_deref(), Some("nope"));
        assert_eq!(step.call_count(), 2);
    }

    #[tokio::test]
    async fn test_recording_step() {
        let log = ExecutionLog::default();
        let step = RecordingStep::wrap(Arc::new(MockStep::new("copy")), log.clone());
        step.execute(sample_state()).await;
        step.execute(sample_state()).await;
        assert_eq!(*log.lock(), vec!["copy", "copy"]);
    }

    #[tokio::test]
    async fn test_scripted_moderation_repeats_last() {
        let step = ScriptedModerationStep::new([false, true]);
        let mut verdicts = Vec::new();
        for _ in 0..3 {
            verdicts.push(step.execute(sample_state()).await.state.approved);
        }
        assert_eq!(verdicts, vec![false, true, true]);
    }

    #[tokio::test]
    async fn test_stub_text_generator_script() {
        let text = StubTextGenerator::new("default")
            .then(Err(CapabilityError::request("openai", "429")));
        let req = TextRequest::new("s", "u");
        assert!(text.generate(&req).await.is_err());
        assert_eq!(text.generate(&req).await.unwrap(), "default");
        assert_eq!(text.requests().len(), 2);
    }
}
