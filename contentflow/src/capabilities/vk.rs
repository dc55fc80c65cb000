//! VK community wall publisher.

use super::{PublishRequest, Publisher};
use crate::config::VkSettings;
use crate::errors::CapabilityError;
use crate::state::{Platform, PublishReceipt};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

const CAPABILITY: &str = "vk";
const WALL_POST_URL: &str = "https://api.vk.com/method/wall.post";
const API_VERSION: &str = "5.131";

#[derive(Debug, Deserialize)]
struct WallPostResponse {
    #[serde(default)]
    response: Option<WallPostResult>,
    #[serde(default)]
    error: Option<VkApiError>,
}

#[derive(Debug, Deserialize)]
struct WallPostResult {
    post_id: i64,
}

#[derive(Debug, Deserialize)]
struct VkApiError {
    #[serde(default)]
    error_msg: Option<String>,
}

/// Posts to a VK community wall.
#[derive(Debug, Clone)]
pub struct VkPublisher {
    http: reqwest::Client,
    access_token: String,
    group_id: String,
    endpoint: String,
}

impl VkPublisher {
    /// Creates a publisher from settings.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::NotConfigured`] when the token or group id is missing.
    pub fn from_settings(settings: &VkSettings) -> Result<Self, CapabilityError> {
        match (&settings.access_token, &settings.group_id) {
            (Some(token), Some(group)) if !token.is_empty() && !group.is_empty() => Ok(Self {
                http: reqwest::Client::new(),
                access_token: token.clone(),
                group_id: group.clone(),
                endpoint: WALL_POST_URL.to_string(),
            }),
            _ => Err(CapabilityError::not_configured(
                CAPABILITY,
                "VK credentials not configured",
            )),
        }
    }

    /// Overrides the `wall.post` endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn params(&self, request: &PublishRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("owner_id", format!("-{}", self.group_id)),
            ("message", request.text.clone()),
            ("access_token", self.access_token.clone()),
            ("v", API_VERSION.to_string()),
        ];
        if !request.images.is_empty() {
            params.push(("attachments", request.images.join(",")));
        }
        if let Some(at) = request.scheduled_time {
            params.push(("publish_date", at.timestamp().to_string()));
        }
        params
    }
}

#[async_trait]
impl Publisher for VkPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt, CapabilityError> {
        let response = self
            .http
            .post(&self.endpoint)
            .query(&self.params(request))
            .send()
            .await
            .map_err(|e| CapabilityError::request(CAPABILITY, e.to_string()))?;

        let parsed: WallPostResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::invalid_response(CAPABILITY, e.to_string()))?;

        match (parsed.response, parsed.error) {
            (Some(result), _) => {
                info!(post_id = result.post_id, "Published to VK");
                Ok(PublishReceipt {
                    post_id: result.post_id.to_string(),
                    platform: Platform::Vk,
                })
            }
            (None, error) => Err(CapabilityError::rejected(
                CAPABILITY,
                error
                    .and_then(|e| e.error_msg)
                    .unwrap_or_else(|| "Unknown error".to_string()),
            )),
        }
    }
}
