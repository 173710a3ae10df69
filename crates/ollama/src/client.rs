//! Ollama API client

use crate::error::OllamaError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama API client
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl OllamaClient {
    /// Create a client for a custom endpoint
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    /// Per-request timeout for chat and tag listing.
    /// Model pulls are never bounded since downloads can take minutes.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// List the names of locally installed models
    pub async fn list_models(&self) -> Result<Vec<String>, OllamaError> {
        let mut request = self.client.get(format!("{}/api/tags", self.base_url));
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let tags: TagsResponse = Self::send(request).await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Download a model, blocking until the pull completes
    pub async fn pull(&self, model: &str) -> Result<(), OllamaError> {
        let request = self
            .client
            .post(format!("{}/api/pull", self.base_url))
            .json(&PullRequest {
                model: model.to_string(),
                stream: false,
            });

        let response: PullResponse = Self::send(request).await?;
        if response.status != "success" {
            return Err(OllamaError::Parse(format!(
                "unexpected pull status: {}",
                response.status
            )));
        }
        Ok(())
    }

    /// Non-streaming chat completion
    pub async fn chat(&self, chat: &ChatRequest) -> Result<ChatResponse, OllamaError> {
        let mut request = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(chat);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        Self::send(request).await
    }

    async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, OllamaError> {
        let response = request
            .send()
            .await
            .map_err(|e| OllamaError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| OllamaError::Parse(e.to_string()))
    }
}

/// Sampling options for chat requests
#[derive(Serialize, Default, Clone)]
pub struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
}

#[derive(Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Deserialize)]
pub struct ChatResponse {
    pub message: Message,
    #[serde(default)]
    pub done: bool,
}

#[derive(Serialize)]
struct PullRequest {
    model: String,
    stream: bool,
}

#[derive(Deserialize)]
struct PullResponse {
    status: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{ "name": "gemma:2b", "size": 1 }, { "name": "llama3:latest" }]
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::with_base_url(server.uri());
        let models = client.list_models().await.unwrap();
        assert_eq!(models, vec!["gemma:2b", "llama3:latest"]);
    }

    #[tokio::test]
    async fn test_chat_sends_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "gemma:2b",
                "stream": false,
                "options": { "num_predict": 64 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": { "role": "assistant", "content": "hello" },
                "done": true
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::with_base_url(format!("{}/", server.uri()));
        let response = client
            .chat(&ChatRequest {
                model: "gemma:2b".to_string(),
                messages: vec![Message::user("hi")],
                stream: false,
                options: Some(ModelOptions {
                    num_predict: Some(64),
                    ..Default::default()
                }),
            })
            .await
            .unwrap();
        assert_eq!(response.message.content, "hello");
        assert!(response.done);
    }

    #[tokio::test]
    async fn test_pull_reports_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
            .mount(&server)
            .await;

        let client = OllamaClient::with_base_url(server.uri());
        match client.pull("gemma:2b").await {
            Err(OllamaError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "disk full");
            }
            other => panic!("expected status error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_unreachable_runtime_is_network_error() {
        let client = OllamaClient::with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_millis(500));
        assert!(matches!(
            client.list_models().await,
            Err(OllamaError::Network(_))
        ));
    }
}
