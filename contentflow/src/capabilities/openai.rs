//! OpenAI chat completions and image generation over HTTP.

use super::{ImageGenerator, ImageRequest, TextGenerator, TextRequest};
use crate::config::OpenAiSettings;
use crate::errors::CapabilityError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

const CAPABILITY: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const IMAGE_MODEL: &str = "dall-e-3";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    n: u8,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
}

/// Client for the OpenAI REST API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f64,
    base_url: String,
}

impl OpenAiClient {
    /// Creates a client from settings.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::NotConfigured`] when no API key is set.
    pub fn from_settings(settings: &OpenAiSettings) -> Result<Self, CapabilityError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CapabilityError::not_configured(CAPABILITY, "missing API key"))?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Overrides the API base URL (for proxies and compatible servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, CapabilityError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| CapabilityError::request(CAPABILITY, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CapabilityError::request(
                CAPABILITY,
                format!("{status}: {text}"),
            ));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| CapabilityError::invalid_response(CAPABILITY, e.to_string()))
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, request: &TextRequest) -> Result<String, CapabilityError> {
        debug!(model = %self.model, "Requesting chat completion");
        let body = ChatCompletionRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
        };

        let response: ChatCompletionResponse = self.post("chat/completions", &body).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CapabilityError::invalid_response(CAPABILITY, "no completion choices"))
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn generate_image(&self, request: &ImageRequest) -> Result<String, CapabilityError> {
        debug!(model = IMAGE_MODEL, size = %request.size, "Requesting image generation");
        let body = ImageGenerationRequest {
            model: IMAGE_MODEL,
            prompt: &request.prompt,
            size: &request.size,
            quality: "standard",
            n: 1,
        };

        let response: ImageGenerationResponse = self.post("images/generations", &body).await?;
        response
            .data
            .into_iter()
            .next()
            .and_then(|image| image.url)
            .ok_or_else(|| CapabilityError::invalid_response(CAPABILITY, "no image url"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        let settings = OpenAiSettings {
            api_key: Some("sk-test".to_string()),
            ..OpenAiSettings::default()
        };
        OpenAiClient::from_settings(&settings)
            .unwrap()
            .with_base_url(server.uri())
    }

    async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(route))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[test]
    fn test_from_settings_requires_key() {
        let settings = OpenAiSettings::default();
        let err = OpenAiClient::from_settings(&settings).unwrap_err();
        assert!(matches!(err, CapabilityError::NotConfigured { .. }));
    }

    #[test]
    fn test_base_url_trimmed() {
        let settings = OpenAiSettings {
            api_key: Some("sk-test".to_string()),
            ..OpenAiSettings::default()
        };
        let client = OpenAiClient::from_settings(&settings)
            .unwrap()
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.base_url, "http://localhost:8080/v1");
        assert_eq!(client.model, "gpt-4");
    }

    #[tokio::test]
    async fn test_generate_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Spring trends"}}]
            })))
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .generate(&TextRequest::new("system", "user"))
            .await
            .unwrap();
        assert_eq!(reply, "Spring trends");
    }

    #[tokio::test]
    async fn test_generate_error_status() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/chat/completions",
            ResponseTemplate::new(429).set_body_string("rate limited"),
        )
        .await;

        let err = client_for(&server)
            .generate(&TextRequest::new("system", "user"))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Request { ref reason, .. } if reason.contains("429") && reason.contains("rate limited")));
    }

    #[tokio::test]
    async fn test_generate_without_choices_is_invalid() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/chat/completions",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
        )
        .await;

        let err = client_for(&server)
            .generate(&TextRequest::new("system", "user"))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_generate_image_returns_url() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/images/generations",
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"data": [{"url": "https://img.example/1.png"}]})),
        )
        .await;

        let url = client_for(&server)
            .generate_image(&ImageRequest::new("a storefront"))
            .await
            .unwrap();
        assert_eq!(url, "https://img.example/1.png");
    }

    #[test]
    fn test_chat_response_parsing() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "hi"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hi"));
    }
}
