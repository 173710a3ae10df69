// Text-generation backends - hosted API, local runtime and simulator behind one trait

mod groq;
mod ollama;
mod registry;
mod simulation;

pub use groq::{GroqBackend, GroqFactory};
pub use self::ollama::{OllamaBackend, OllamaFactory};
pub use registry::{ProviderFactory, ProviderRegistry};
pub use simulation::{Intent, SimulationBackend, SimulationFactory};

use crate::config::ProviderConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_MAX_TOKENS: u32 = 1500;

/// Uniform text generation regardless of the service behind it.
///
/// Implementations hold no mutable state; call counting belongs to the
/// orchestrator run so one backend can be shared across concurrent runs.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Generate a completion for a single user prompt
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError>;

    /// Provider identifier, for reporting
    fn provider_type(&self) -> &str;

    /// Model identifier, for reporting
    fn model_name(&self) -> &str;
}

/// Concrete providers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Groq,
    Ollama,
    Simulation,
}

impl ProviderKind {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Simulation => "simulation",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            ProviderKind::Groq => "Hosted Groq API (requires GROQ_API_KEY)",
            ProviderKind::Ollama => "Local Ollama runtime",
            ProviderKind::Simulation => "Deterministic canned responses, no network",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(ProviderKind::Groq),
            "ollama" => Ok(ProviderKind::Ollama),
            "simulation" => Ok(ProviderKind::Simulation),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// The single configuration string driving provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProviderSelector {
    #[default]
    Auto,
    Explicit(ProviderKind),
}

impl fmt::Display for ProviderSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderSelector::Auto => f.write_str("auto"),
            ProviderSelector::Explicit(kind) => kind.fmt(f),
        }
    }
}

impl FromStr for ProviderSelector {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            Ok(ProviderSelector::Auto)
        } else {
            s.parse().map(ProviderSelector::Explicit)
        }
    }
}

impl TryFrom<String> for ProviderSelector {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProviderSelector> for String {
    fn from(selector: ProviderSelector) -> Self {
        selector.to_string()
    }
}

/// Resolve a backend using the built-in provider table
pub async fn select(
    selector: ProviderSelector,
    config: &ProviderConfig,
) -> Result<Arc<dyn Backend>, ConfigError> {
    ProviderRegistry::with_defaults().select(selector, config).await
}

/// Raised while constructing a backend; never swallowed by the backend itself
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Missing credentials: {0} is not set")]
    MissingCredentials(&'static str),

    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("Failed to pull model {model}: {reason}")]
    ModelPull { model: String, reason: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Raised by a single generate call on a live provider
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parsing() {
        assert_eq!("auto".parse::<ProviderSelector>().unwrap(), ProviderSelector::Auto);
        assert_eq!(
            " Ollama ".parse::<ProviderSelector>().unwrap(),
            ProviderSelector::Explicit(ProviderKind::Ollama)
        );
        assert!(matches!(
            "openai".parse::<ProviderSelector>(),
            Err(ConfigError::UnknownProvider(name)) if name == "openai"
        ));
    }

    #[test]
    fn test_selector_serde_as_string() {
        let selector = ProviderSelector::Explicit(ProviderKind::Groq);
        assert_eq!(serde_json::to_string(&selector).unwrap(), "\"groq\"");
        let parsed: ProviderSelector = serde_json::from_str("\"simulation\"").unwrap();
        assert_eq!(parsed, ProviderSelector::Explicit(ProviderKind::Simulation));
        assert!(serde_json::from_str::<ProviderSelector>("\"gpt\"").is_err());
    }
}
