//! External capabilities consumed by the concrete steps.
//!
//! The orchestrator never constructs these; callers build them once and
//! inject them through [`Capabilities`]. HTTP-backed implementations live
//! behind the `http` feature.

mod metrics;

#[cfg(feature = "http")]
mod openai;
#[cfg(feature = "http")]
mod telegram;
#[cfg(feature = "http")]
mod vk;

pub use metrics::StaticMetricsSource;
#[cfg(feature = "http")]
pub use openai::OpenAiClient;
#[cfg(feature = "http")]
pub use telegram::TelegramPublisher;
#[cfg(feature = "http")]
pub use vk::VkPublisher;

use crate::errors::CapabilityError;
use crate::state::{Platform, PostMetrics, PublishReceipt};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A prompt for a text generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRequest {
    /// System instruction.
    pub system: String,
    /// User message.
    pub user: String,
}

impl TextRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// A prompt for an image generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Image prompt.
    pub prompt: String,
    /// Requested size, e.g. "1024x1024".
    pub size: String,
}

impl ImageRequest {
    /// Creates a request at the default square size.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: "1024x1024".to_string(),
        }
    }
}

/// A post to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Target platform.
    pub platform: Platform,
    /// Post text.
    pub text: String,
    /// Image references to attach.
    pub images: Vec<String>,
    /// Requested publication time.
    pub scheduled_time: Option<DateTime<Utc>>,
}

/// Which post to fetch metrics for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsQuery {
    /// Platform-side post id, if the post was published.
    pub post_id: Option<String>,
    /// The platform.
    pub platform: Platform,
}

/// Text generation (an LLM chat call).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates a completion for the request.
    async fn generate(&self, request: &TextRequest) -> Result<String, CapabilityError>;
}

/// Image generation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generates an image and returns its URL.
    async fn generate_image(&self, request: &ImageRequest) -> Result<String, CapabilityError>;
}

/// Publishing to a social platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes the post and returns the platform receipt.
    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt, CapabilityError>;
}

/// Source of engagement metrics for published posts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Fetches metrics for a post.
    async fn fetch(&self, query: &MetricsQuery) -> Result<PostMetrics, CapabilityError>;
}

/// Routes publish requests to a per-platform publisher.
#[derive(Clone, Default)]
pub struct PlatformPublisher {
    publishers: HashMap<Platform, Arc<dyn Publisher>>,
}

impl PlatformPublisher {
    /// Creates a router with no platforms.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the publisher for a platform.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform, publisher: Arc<dyn Publisher>) -> Self {
        self.publishers.insert(platform, publisher);
        self
    }

    /// Returns true if a publisher exists for the platform.
    #[must_use]
    pub fn supports(&self, platform: Platform) -> bool {
        self.publishers.contains_key(&platform)
    }
}

impl fmt::Debug for PlatformPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut platforms: Vec<_> = self.publishers.keys().map(ToString::to_string).collect();
        platforms.sort();
        f.debug_struct("PlatformPublisher")
            .field("platforms", &platforms)
            .finish()
    }
}

#[async_trait]
impl Publisher for PlatformPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt, CapabilityError> {
        let publisher = self.publishers.get(&request.platform).ok_or_else(|| {
            CapabilityError::not_configured(
                request.platform.to_string(),
                "no publisher registered for platform",
            )
        })?;
        publisher.publish(request).await
    }
}

/// The capability set handed to the concrete steps.
#[derive(Clone)]
pub struct Capabilities {
    /// Text generation used by research, strategy, copy, moderation and analyze.
    pub text: Arc<dyn TextGenerator>,
    /// Image generation used by the image step.
    pub images: Arc<dyn ImageGenerator>,
    /// Publishing used by the publish step.
    pub publisher: Arc<dyn Publisher>,
    /// Metrics used by the analyze step.
    pub metrics: Arc<dyn MetricsSource>,
}

impl Capabilities {
    /// Bundles the capabilities.
    #[must_use]
    pub fn new(
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageGenerator>,
        publisher: Arc<dyn Publisher>,
        metrics: Arc<dyn MetricsSource>,
    ) -> Self {
        Self {
            text,
            images,
            publisher,
            metrics,
        }
    }
}

#[cfg(feature = "http")]
impl Capabilities {
    /// Builds HTTP-backed capabilities from settings.
    ///
    /// OpenAI serves text and images. Platforms without credentials are left
    /// out of the publisher and fail with [`CapabilityError::NotConfigured`]
    /// when a run targets them. Metrics come from [`StaticMetricsSource`].
    ///
    /// # Errors
    ///
    /// Returns an error if the OpenAI API key is missing.
    pub fn from_settings(settings: &crate::config::Settings) -> Result<Self, CapabilityError> {
        let openai = Arc::new(OpenAiClient::from_settings(&settings.openai)?);

        let mut publisher = PlatformPublisher::new();
        match TelegramPublisher::from_settings(&settings.telegram) {
            Ok(telegram) => publisher = publisher.with_platform(Platform::Telegram, Arc::new(telegram)),
            Err(e) => tracing::debug!(error = %e, "Telegram publishing disabled"),
        }
        match VkPublisher::from_settings(&settings.vk) {
            Ok(vk) => publisher = publisher.with_platform(Platform::Vk, Arc::new(vk)),
            Err(e) => tracing::debug!(error = %e, "VK publishing disabled"),
        }

        Ok(Self::new(
            openai.clone(),
            openai,
            Arc::new(publisher),
            Arc::new(StaticMetricsSource::default()),
        ))
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
