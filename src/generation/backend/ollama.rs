// Ollama backend - local model runtime through the ollama client crate

use super::{Backend, ConfigError, GenerationError, ProviderFactory, ProviderKind};
use crate::config::{OllamaConfig, ProviderConfig};
use async_trait::async_trait;
use ::ollama::{ChatRequest, Message, ModelOptions, OllamaClient, OllamaError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct OllamaBackend {
    client: OllamaClient,
    model: String,
    temperature: f32,
}

impl OllamaBackend {
    /// Probe the runtime and make sure the model is installed.
    /// Failures surface immediately and are not retried.
    pub async fn connect(config: &OllamaConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let client = OllamaClient::with_base_url(&config.host).with_timeout(timeout);

        let installed = client
            .list_models()
            .await
            .map_err(|e| ConfigError::RuntimeUnavailable(format!("{}: {}", config.host, e)))?;

        let model = &config.model;
        let present = installed
            .iter()
            .any(|m| m == model || *m == format!("{}:latest", model));

        if !present {
            if config.pull_on_start {
                info!("Pulling model {} from {}", model, config.host);
                client.pull(model).await.map_err(|e| ConfigError::ModelPull {
                    model: model.clone(),
                    reason: e.to_string(),
                })?;
                info!("Model {} ready", model);
            } else {
                warn!("Model {} is not installed and pull_on_start is disabled", model);
            }
        }

        Ok(Self {
            client,
            model: model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            stream: false,
            options: Some(ModelOptions {
                temperature: Some(self.temperature),
                num_predict: Some(i32::try_from(max_tokens).unwrap_or(i32::MAX)),
            }),
        };

        let response = self.client.chat(&request).await?;
        Ok(response.message.content)
    }

    fn provider_type(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

impl From<OllamaError> for GenerationError {
    fn from(err: OllamaError) -> Self {
        match err {
            OllamaError::Network(msg) => GenerationError::Network(msg),
            OllamaError::Status { status, body } => GenerationError::Status { status, body },
            OllamaError::Parse(msg) => GenerationError::MalformedResponse(msg),
        }
    }
}

pub struct OllamaFactory;

#[async_trait]
impl ProviderFactory for OllamaFactory {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    async fn is_available(&self, config: &ProviderConfig) -> bool {
        OllamaClient::with_base_url(&config.ollama.host)
            .with_timeout(Duration::from_millis(config.ollama.probe_timeout_ms))
            .list_models()
            .await
            .is_ok()
    }

    async fn connect(&self, config: &ProviderConfig) -> Result<Arc<dyn Backend>, ConfigError> {
        let backend = OllamaBackend::connect(&config.ollama, config.request_timeout()).await?;
        Ok(Arc::new(backend))
    }
}
