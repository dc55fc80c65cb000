//! Result records produced by the individual steps.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Platform;

/// Market research produced by the research step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResearchData {
    /// Trends, competitors and audience insights as returned by the model.
    pub market_trends: String,
    /// Competitor analysis.
    #[serde(default)]
    pub competitor_analysis: String,
    /// Audience insights.
    #[serde(default)]
    pub insights: String,
    /// Recommended content themes.
    #[serde(default)]
    pub recommendations: String,
}

/// Posting cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostingSchedule {
    /// Human readable frequency, e.g. "3-5 posts per week".
    pub frequency: String,
    /// Preferred posting times (HH:MM).
    pub optimal_times: Vec<String>,
}

impl Default for PostingSchedule {
    fn default() -> Self {
        Self {
            frequency: "3-5 posts per week".to_string(),
            optimal_times: vec!["09:00".to_string(), "13:00".to_string(), "18:00".to_string()],
        }
    }
}

/// Metrics a strategy aims for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetMetrics {
    /// Target engagement rate (0..1).
    pub engagement_rate: f64,
    /// Target reach.
    pub reach: u64,
    /// Target conversions.
    pub conversions: u64,
}

impl Default for TargetMetrics {
    fn default() -> Self {
        Self {
            engagement_rate: 0.05,
            reach: 10_000,
            conversions: 100,
        }
    }
}

/// Content strategy produced by the strategy step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Strategy {
    /// Goals and objectives as returned by the model.
    pub goals: String,
    /// Content themes.
    pub themes: Vec<String>,
    /// Posting schedule.
    #[serde(default)]
    pub posting_schedule: PostingSchedule,
    /// Target metrics.
    #[serde(default)]
    pub target_metrics: TargetMetrics,
}

impl Strategy {
    /// Default content themes used when the model does not supply any.
    pub const DEFAULT_THEMES: [&'static str; 5] = [
        "business_tips",
        "industry_news",
        "product_updates",
        "behind_scenes",
        "user_stories",
    ];

    /// Creates a strategy with default themes, schedule and targets.
    #[must_use]
    pub fn with_goals(goals: impl Into<String>) -> Self {
        Self {
            goals: goals.into(),
            themes: Self::DEFAULT_THEMES.iter().map(|t| (*t).to_string()).collect(),
            posting_schedule: PostingSchedule::default(),
            target_metrics: TargetMetrics::default(),
        }
    }
}

/// Post copy produced by the copy step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Content {
    /// Main post text.
    pub text: String,
    /// A/B variations, the first being the main text.
    #[serde(default)]
    pub variations: Vec<String>,
    /// Platform the copy was written for.
    pub platform: Platform,
    /// Theme the copy was written for.
    pub theme: String,
}

/// Verdict of the moderation step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModerationResult {
    /// Whether the content may be published.
    pub approved: bool,
    /// Full reasoning returned by the moderator.
    pub reason: String,
    /// Improvement suggestions, empty when approved.
    #[serde(default)]
    pub suggestions: String,
}

/// Receipt of a successful publish call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishReceipt {
    /// Platform-side identifier of the post.
    pub post_id: String,
    /// Where the post went.
    pub platform: Platform,
}

/// Engagement metrics of a published post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostMetrics {
    /// Likes.
    pub likes: u64,
    /// Shares / reposts.
    pub shares: u64,
    /// Comments.
    pub comments: u64,
    /// Views.
    pub views: u64,
    /// Engagement rate (0..1).
    pub engagement_rate: f64,
}

/// Performance analysis produced by the analyze step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Analytics {
    /// Raw metrics the analysis is based on.
    pub metrics: PostMetrics,
    /// Analysis text returned by the model.
    pub analysis: String,
    /// Actionable recommendations.
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Named trend values.
    #[serde(default)]
    pub trends: HashMap<String, f64>,
}
