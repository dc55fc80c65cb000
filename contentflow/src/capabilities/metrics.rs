//! Fixed metrics source used until a platform statistics adapter exists.

use super::{MetricsQuery, MetricsSource};
use crate::errors::CapabilityError;
use crate::state::PostMetrics;
use async_trait::async_trait;

/// Returns the same metrics for every post.
#[derive(Debug, Clone)]
pub struct StaticMetricsSource {
    metrics: PostMetrics,
}

impl Default for StaticMetricsSource {
    fn default() -> Self {
        Self {
            metrics: PostMetrics {
                likes: 150,
                shares: 25,
                comments: 10,
                views: 2000,
                engagement_rate: 0.0925,
            },
        }
    }
}

impl StaticMetricsSource {
    /// Creates a source that always reports `metrics`.
    #[must_use]
    pub fn new(metrics: PostMetrics) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl MetricsSource for StaticMetricsSource {
    async fn fetch(&self, _query: &MetricsQuery) -> Result<PostMetrics, CapabilityError> {
        Ok(self.metrics.clone())
    }
}
