//! Telegram Bot API publisher.

use super::{PublishRequest, Publisher};
use crate::config::TelegramSettings;
use crate::errors::CapabilityError;
use crate::state::{Platform, PublishReceipt};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

const CAPABILITY: &str = "telegram";
const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    result: Option<SentMessage>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Posts to a Telegram chat or channel through a bot.
#[derive(Debug, Clone)]
pub struct TelegramPublisher {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
    api_base: String,
}

impl TelegramPublisher {
    /// Creates a publisher from settings.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::NotConfigured`] when the bot token or chat id is missing.
    pub fn from_settings(settings: &TelegramSettings) -> Result<Self, CapabilityError> {
        match (&settings.bot_token, &settings.chat_id) {
            (Some(token), Some(chat)) if !token.is_empty() && !chat.is_empty() => Ok(Self {
                http: reqwest::Client::new(),
                bot_token: token.clone(),
                chat_id: chat.clone(),
                api_base: API_BASE.to_string(),
            }),
            _ => Err(CapabilityError::not_configured(
                CAPABILITY,
                "Telegram credentials not configured",
            )),
        }
    }

    /// Overrides the Bot API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    fn payload(&self, request: &PublishRequest) -> (&'static str, serde_json::Value) {
        match request.images.first() {
            Some(photo) => (
                "sendPhoto",
                serde_json::json!({
                    "chat_id": self.chat_id,
                    "caption": request.text,
                    "photo": photo,
                }),
            ),
            None => (
                "sendMessage",
                serde_json::json!({
                    "chat_id": self.chat_id,
                    "text": request.text,
                }),
            ),
        }
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt, CapabilityError> {
        if request.scheduled_time.is_some() {
            debug!("Telegram Bot API has no scheduled posts; publishing immediately");
        }

        let (method, body) = self.payload(request);
        let response = self
            .http
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| CapabilityError::request(CAPABILITY, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CapabilityError::request(CAPABILITY, e.to_string()))?;
        let parsed: SendResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(CapabilityError::request(CAPABILITY, format!("HTTP {status}")));
            }
            Err(e) => return Err(CapabilityError::invalid_response(CAPABILITY, e.to_string())),
        };

        if !status.is_success() || !parsed.ok {
            return Err(CapabilityError::rejected(
                CAPABILITY,
                parsed
                    .description
                    .unwrap_or_else(|| format!("HTTP {status}")),
            ));
        }

        let message = parsed
            .result
            .ok_or_else(|| CapabilityError::invalid_response(CAPABILITY, "missing result"))?;

        info!(method, message_id = message.message_id, "Published to Telegram");
        Ok(PublishReceipt {
            post_id: message.message_id.to_string(),
            platform: Platform::Telegram,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher() -> TelegramPublisher {
        TelegramPublisher::from_settings(&TelegramSettings {
            bot_token: Some("123:abc".to_string()),
            chat_id: Some("@acme".to_string()),
        })
        .unwrap()
    }

    fn request(images: Vec<String>) -> PublishRequest {
        PublishRequest {
            platform: Platform::Telegram,
            text: "Fresh deals".to_string(),
            images,
            scheduled_time: None,
        }
    }

    #[test]
    fn test_requires_credentials() {
        let err = TelegramPublisher::from_settings(&TelegramSettings::default()).unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn test_text_only_uses_send_message() {
        let (method, body) = publisher().payload(&request(vec![]));
        assert_eq!(method, "sendMessage");
        assert_eq!(body["text"], "Fresh deals");
        assert_eq!(body["chat_id"], "@acme");
    }

    #[test]
    fn test_image_uses_send_photo_with_caption() {
        let (method, body) = publisher().payload(&request(vec!["https://img/1.png".to_string()]));
        assert_eq!(method, "sendPhoto");
        assert_eq!(body["caption"], "Fresh deals");
        assert_eq!(body["photo"], "https://img/1.png");
    }

    #[test]
    fn test_method_url() {
        let url = publisher().with_api_base("http://localhost:9000/").method_url("sendMessage");
        assert_eq!(url, "http://localhost:9000/bot123:abc/sendMessage");
    }

    async fn mock_api(response: ResponseTemplate) -> (MockServer, TelegramPublisher) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .and(body_partial_json(serde_json::json!({"chat_id": "@acme"})))
            .respond_with(response)
            .mount(&server)
            .await;

        let publisher = TelegramPublisher::from_settings(&TelegramSettings {
            bot_token: Some("test-token".to_string()),
            chat_id: Some("@acme".to_string()),
        })
        .unwrap()
        .with_api_base(server.uri());
        (server, publisher)
    }

    #[tokio::test]
    async fn test_publish_returns_message_id() {
        let response = ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({"ok": true, "result": {"message_id": 42}}));
        let (_server, publisher) = mock_api(response).await;

        let receipt = publisher.publish(&request(vec![])).await.unwrap();
        assert_eq!(receipt.post_id, "42");
        assert_eq!(receipt.platform, Platform::Telegram);
    }

    #[tokio::test]
    async fn test_publish_not_ok_is_rejected() {
        let response = ResponseTemplate::new(400).set_body_json(
            serde_json::json!({"ok": false, "description": "Bad Request: chat not found"}),
        );
        let (_server, publisher) = mock_api(response).await;

        let err = publisher.publish(&request(vec![])).await.unwrap_err();
        assert_eq!(
            err,
            CapabilityError::rejected(CAPABILITY, "Bad Request: chat not found")
        );
    }

    #[tokio::test]
    async fn test_publish_non_json_error_reports_status() {
        let response = ResponseTemplate::new(502).set_body_string("Bad Gateway");
        let (_server, publisher) = mock_api(response).await;

        let err = publisher.publish(&request(vec![])).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Request { ref reason, .. } if reason.contains("502")));
    }

    #[tokio::test]
    async fn test_publish_ok_without_result_is_invalid() {
        let response = ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true}));
        let (_server, publisher) = mock_api(response).await;

        let err = publisher.publish(&request(vec![])).await.unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidResponse { .. }));
    }
}
