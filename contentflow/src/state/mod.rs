//! The typed state threaded through every step of a run.
//!
//! A [`PipelineState`] is created once per run, moved into each step and
//! moved back out. Each domain field has exactly one writing step; the
//! run-scoped parameters are fixed at entry and checked by the orchestrator
//! after every step.

mod records;

pub use records::{
    Analytics, Content, ModerationResult, PostMetrics, PostingSchedule, PublishReceipt,
    ResearchData, Strategy, TargetMetrics,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Social platform a run publishes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Telegram channel via the Bot API.
    #[default]
    Telegram,
    /// VK community wall.
    Vk,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Telegram => write!(f, "telegram"),
            Self::Vk => write!(f, "vk"),
        }
    }
}

/// Description of the business the content is produced for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusinessContext {
    /// Company name.
    pub name: String,
    /// Industry.
    pub industry: String,
    /// Target audience.
    #[serde(default)]
    pub target_audience: String,
    /// Free-form brand guidelines used by moderation.
    #[serde(default)]
    pub brand_guidelines: Option<String>,
}

impl BusinessContext {
    /// Creates a context with a name and industry.
    #[must_use]
    pub fn new(name: impl Into<String>, industry: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            industry: industry.into(),
            target_audience: String::new(),
            brand_guidelines: None,
        }
    }

    /// Sets the target audience.
    #[must_use]
    pub fn with_target_audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = audience.into();
        self
    }

    /// Sets the brand guidelines.
    #[must_use]
    pub fn with_brand_guidelines(mut self, guidelines: impl Into<String>) -> Self {
        self.brand_guidelines = Some(guidelines.into());
        self
    }
}

/// Names of the fields of [`PipelineState`], used for change tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    /// `business_id`
    BusinessId,
    /// `business_context`
    BusinessContext,
    /// `research_data`
    ResearchData,
    /// `strategy`
    Strategy,
    /// `content`
    Content,
    /// `images`
    Images,
    /// `moderation_result`
    ModerationResult,
    /// `approved`
    Approved,
    /// `published`
    Published,
    /// `publication`
    Publication,
    /// `analytics`
    Analytics,
    /// `error`
    Error,
    /// `platform`
    Platform,
    /// `theme`
    Theme,
    /// `style`
    Style,
    /// `scheduled_time`
    ScheduledTime,
}

impl StateField {
    /// Returns the serialized field name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BusinessId => "business_id",
            Self::BusinessContext => "business_context",
            Self::ResearchData => "research_data",
            Self::Strategy => "strategy",
            Self::Content => "content",
            Self::Images => "images",
            Self::ModerationResult => "moderation_result",
            Self::Approved => "approved",
            Self::Published => "published",
            Self::Publication => "publication",
            Self::Analytics => "analytics",
            Self::Error => "error",
            Self::Platform => "platform",
            Self::Theme => "theme",
            Self::Style => "style",
            Self::ScheduledTime => "scheduled_time",
        }
    }

    /// Returns true for fields fixed at run entry.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::BusinessId
                | Self::BusinessContext
                | Self::Platform
                | Self::Theme
                | Self::Style
                | Self::ScheduledTime
        )
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_theme() -> String {
    "general".to_string()
}

fn default_style() -> String {
    "modern".to_string()
}

/// The record carried through a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineState {
    /// Identifier of the business in the caller's records.
    #[serde(default)]
    pub business_id: Option<u64>,
    /// The subject business.
    pub business_context: BusinessContext,
    /// Written by the research step.
    #[serde(default)]
    pub research_data: Option<ResearchData>,
    /// Written by the strategy step.
    #[serde(default)]
    pub strategy: Option<Strategy>,
    /// Written by the copy step.
    #[serde(default)]
    pub content: Option<Content>,
    /// Image references, written by the image step.
    #[serde(default)]
    pub images: Vec<String>,
    /// Written by the moderation step.
    #[serde(default)]
    pub moderation_result: Option<ModerationResult>,
    /// Written by the moderation step.
    #[serde(default)]
    pub approved: bool,
    /// Written by the publish step.
    #[serde(default)]
    pub published: bool,
    /// Written by the publish step.
    #[serde(default)]
    pub publication: Option<PublishReceipt>,
    /// Written by the analyze step.
    #[serde(default)]
    pub analytics: Option<Analytics>,
    /// Reason of the last failed step, if any.
    #[serde(default)]
    pub error: Option<String>,
    /// Target platform.
    #[serde(default)]
    pub platform: Platform,
    /// Content theme.
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Image style.
    #[serde(default = "default_style")]
    pub style: String,
    /// When the post should go out; `None` publishes immediately.
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new(BusinessContext::default())
    }
}

impl PipelineState {
    /// Creates a state with every result field at its zero value.
    #[must_use]
    pub fn new(business_context: BusinessContext) -> Self {
        Self {
            business_id: None,
            business_context,
            research_data: None,
            strategy: None,
            content: None,
            images: Vec::new(),
            moderation_result: None,
            approved: false,
            published: false,
            publication: None,
            analytics: None,
            error: None,
            platform: Platform::default(),
            theme: default_theme(),
            style: default_style(),
            scheduled_time: None,
        }
    }

    /// Sets the business id.
    #[must_use]
    pub fn with_business_id(mut self, id: u64) -> Self {
        self.business_id = Some(id);
        self
    }

    /// Sets the platform.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Sets the theme.
    #[must_use]
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    /// Sets the image style.
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Sets the scheduled publication time.
    #[must_use]
    pub fn with_scheduled_time(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_time = Some(at);
        self
    }

    /// Parses a state from JSON, rejecting unknown fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns true if an error marker is set.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Text of the current content, or an empty string.
    #[must_use]
    pub fn content_text(&self) -> &str {
        self.content.as_ref().map_or("", |c| c.text.as_str())
    }

    /// Lists the fields whose values differ between `before` and `after`.
    #[must_use]
    pub fn changed_fields(before: &Self, after: &Self) -> Vec<StateField> {
        let mut changed = Vec::new();
        let mut check = |differs: bool, field: StateField| {
            if differs {
                changed.push(field);
            }
        };

        check(before.business_id != after.business_id, StateField::BusinessId);
        check(before.business_context != after.business_context, StateField::BusinessContext);
        check(before.research_data != after.research_data, StateField::ResearchData);
        check(before.strategy != after.strategy, StateField::Strategy);
        check(before.content != after.content, StateField::Content);
        check(before.images != after.images, StateField::Images);
        check(before.moderation_result != after.moderation_result, StateField::ModerationResult);
        check(before.approved != after.approved, StateField::Approved);
        check(before.published != after.published, StateField::Published);
        check(before.publication != after.publication, StateField::Publication);
        check(before.analytics != after.analytics, StateField::Analytics);
        check(before.error != after.error, StateField::Error);
        check(before.platform != after.platform, StateField::Platform);
        check(before.theme != after.theme, StateField::Theme);
        check(before.style != after.style, StateField::Style);
        check(before.scheduled_time != after.scheduled_time, StateField::ScheduledTime);

        changed
    }

    /// Returns the first run-scoped field that differs from `before`.
    #[must_use]
    pub fn read_only_violation(before: &Self, after: &Self) -> Option<StateField> {
        Self::changed_fields(before, after)
            .into_iter()
            .find(StateField::is_read_only)
    }
}
