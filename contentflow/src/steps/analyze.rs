//! Post-publication analytics step.

use super::{Step, StepOutput};
use crate::capabilities::{MetricsQuery, MetricsSource, TextGenerator, TextRequest};
use crate::state::{Analytics, PipelineState};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are an expert social media analyst who identifies patterns and provides actionable recommendations.";

/// Fetches engagement metrics for the published post and writes `analytics`.
pub struct AnalyzeStep {
    metrics: Arc<dyn MetricsSource>,
    text: Arc<dyn TextGenerator>,
}

impl AnalyzeStep {
    /// Creates the step over a metrics source and a text generator.
    pub fn new(metrics: Arc<dyn MetricsSource>, text: Arc<dyn TextGenerator>) -> Self {
        Self { metrics, text }
    }
}

impl fmt::Debug for AnalyzeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzeStep").finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for AnalyzeStep {
    fn name(&self) -> &str {
        "analyze"
    }

    async fn execute(&self, mut state: PipelineState) -> StepOutput {
        let query = MetricsQuery {
            post_id: state.publication.as_ref().map(|p| p.post_id.clone()),
            platform: state.platform,
        };

        let metrics = match self.metrics.fetch(&query).await {
            Ok(metrics) => metrics,
            Err(e) => return StepOutput::fail(state, format!("Analytics error: {e}")),
        };

        let metrics_json = serde_json::to_string(&metrics).unwrap_or_default();
        let request = TextRequest::new(
            SYSTEM_PROMPT,
            format!(
                "Analyze the performance data for this post:\n\n\
                 Post ID: {}\nPlatform: {}\nMetrics: {metrics_json}\n\n\
                 Provide:\n\
                 1. Performance summary\n\
                 2. Key insights and patterns\n\
                 3. Recommendations for improvement\n\
                 4. Content strategy adjustments",
                query.post_id.as_deref().unwrap_or("0"),
                query.platform
            ),
        );

        match self.text.generate(&request).await {
            Ok(analysis) => {
                state.analytics = Some(Analytics {
                    metrics,
                    analysis,
                    recommendations: Vec::new(),
                    trends: HashMap::new(),
                });
                StepOutput::proceed(state)
            }
            Err(e) => StepOutput::fail(state, format!("Analytics error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{MockMetricsSource, MockTextGenerator, StaticMetricsSource};
    use crate::errors::CapabilityError;
    use crate::state::{BusinessContext, Platform, PublishReceipt};

    fn published() -> PipelineState {
        let mut state = PipelineState::new(BusinessContext::new("Acme", "Retail"));
        state.published = true;
        state.publication = Some(PublishReceipt {
            post_id: "42".to_string(),
            platform: Platform::Telegram,
        });
        state
    }

    #[tokio::test]
    async fn test_writes_analytics() {
        let mut text = MockTextGenerator::new();
        text.expect_generate()
            .withf(|req| req.user.contains("Post ID: 42") && req.user.contains("\"views\":2000"))
            .returning(|_| Ok("Strong morning engagement".to_string()));

        let step = AnalyzeStep::new(Arc::new(StaticMetricsSource::default()), Arc::new(text));
        let output = step.execute(published()).await;

        assert!(output.is_success());
        let analytics = output.state.analytics.unwrap();
        assert_eq!(analytics.metrics.likes, 150);
        assert_eq!(analytics.analysis, "Strong morning engagement");
    }

    #[tokio::test]
    async fn test_queries_by_post_id() {
        let mut metrics = MockMetricsSource::new();
        metrics
            .expect_fetch()
            .withf(|q| q.post_id.as_deref() == Some("42"))
            .returning(|_| Err(CapabilityError::request("metrics", "unavailable")));
        let mut text = MockTextGenerator::new();
        text.expect_generate().never();

        let output = AnalyzeStep::new(Arc::new(metrics), Arc::new(text))
            .execute(published())
            .await;
        assert!(!output.is_success());
        assert!(output.state.analytics.is_none());
    }
}
