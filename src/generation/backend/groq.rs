// Groq backend - OpenAI-compatible chat completions over HTTPS

use super::{Backend, ConfigError, GenerationError, ProviderFactory, ProviderKind};
use crate::config::{GroqConfig, ProviderConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub struct GroqBackend {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
    temperature: f32,
}

impl GroqBackend {
    pub fn connect(config: &GroqConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingCredentials("GROQ_API_KEY"))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            url: format!("{}/chat/completions", config.endpoint.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl Backend for GroqBackend {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::MalformedResponse("no choices in response".to_string()))
    }

    fn provider_type(&self) -> &str {
        "groq"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

pub struct GroqFactory;

#[async_trait]
impl ProviderFactory for GroqFactory {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Groq
    }

    async fn is_available(&self, config: &ProviderConfig) -> bool {
        config
            .groq
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    async fn connect(&self, config: &ProviderConfig) -> Result<Arc<dyn Backend>, ConfigError> {
        let backend = GroqBackend::connect(&config.groq, config.request_timeout())?;
        Ok(Arc::new(backend))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> GroqConfig {
        GroqConfig {
            api_key: Some("gsk_test".to_string()),
            endpoint: format!("{}/openai/v1", server.uri()),
            ..GroqConfig::default()
        }
    }

    #[test]
    fn test_missing_key() {
        let result = GroqBackend::connect(&GroqConfig::default(), Duration::from_secs(5));
        assert!(matches!(result, Err(ConfigError::MissingCredentials("GROQ_API_KEY"))));

        let blank = GroqConfig {
            api_key: Some("  ".to_string()),
            ..GroqConfig::default()
        };
        assert!(GroqBackend::connect(&blank, Duration::from_secs(5)).is_err());
    }

    #[tokio::test]
    async fn test_generate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(header("authorization", "Bearer gsk_test"))
            .and(body_partial_json(json!({
                "model": "mixtral-8x7b-32768",
                "max_tokens": 256,
                "messages": [{ "role": "user", "content": "Hello" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Hi there" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = GroqBackend::connect(&config_for(&server), Duration::from_secs(5)).unwrap();
        assert_eq!(backend.generate("Hello", 256).await.unwrap(), "Hi there");
        assert_eq!(backend.provider_type(), "groq");
        assert_eq!(backend.model_name(), "mixtral-8x7b-32768");
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let backend = GroqBackend::connect(&config_for(&server), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            backend.generate("Hello", 16).await,
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let backend = GroqBackend::connect(&config_for(&server), Duration::from_secs(5)).unwrap();
        match backend.generate("Hello", 16).await {
            Err(GenerationError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_factory_availability_tracks_key() {
        let mut config = ProviderConfig::default();
        assert!(!GroqFactory.is_available(&config).await);
        config.groq.api_key = Some("gsk_test".to_string());
        assert!(GroqFactory.is_available(&config).await);
    }
}
