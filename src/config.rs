//! Configuration file and environment support

use crate::error::Result;
use crate::generation::backend::{DEFAULT_MAX_TOKENS, ProviderKind, ProviderSelector};
use crate::generation::{DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_QUALITY_SCORE, GenerationRequest};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_min_quality_score")]
    pub min_quality_score: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// `auto`, `groq`, `ollama` or `simulation`
    #[serde(default)]
    pub selector: ProviderSelector,

    /// Tried first when the selector is `auto`; taken from `LLM_PROVIDER`
    #[serde(skip)]
    pub env_override: Option<ProviderKind>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub groq: GroqConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqConfig {
    /// Usually supplied through `GROQ_API_KEY` rather than the file
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_groq_model")]
    pub model: String,

    #[serde(default = "default_groq_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_host")]
    pub host: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Pull the model during setup when the runtime does not have it yet
    #[serde(default = "default_pull_on_start")]
    pub pull_on_start: bool,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// How long `auto` selection waits for the runtime to answer
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    #[serde(default = "default_experiments_dir")]
    pub experiments_dir: PathBuf,

    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

// Defaults

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_min_quality_score() -> f64 {
    DEFAULT_MIN_QUALITY_SCORE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_request_timeout() -> u64 {
    120
}

fn default_groq_model() -> String {
    "mixtral-8x7b-32768".to_string()
}

fn default_groq_endpoint() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_ollama_host() -> String {
    ollama::DEFAULT_BASE_URL.to_string()
}

fn default_ollama_model() -> String {
    "gemma:2b".to_string()
}

fn default_pull_on_start() -> bool {
    true
}

fn default_probe_timeout() -> u64 {
    2000
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_experiments_dir() -> PathBuf {
    PathBuf::from("experiments")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            min_quality_score: default_min_quality_score(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            selector: ProviderSelector::Auto,
            env_override: None,
            request_timeout_secs: default_request_timeout(),
            groq: GroqConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_groq_model(),
            endpoint: default_groq_endpoint(),
            temperature: default_temperature(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
            pull_on_start: default_pull_on_start(),
            temperature: default_temperature(),
            probe_timeout_ms: default_probe_timeout(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            experiments_dir: default_experiments_dir(),
            reports_dir: default_reports_dir(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from an explicit path, else the default location if it exists,
    /// else built-in defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(path)?,
                None => Self::default(),
            },
        };
        config.apply_env();
        Ok(config)
    }

    /// `~/.config/autonowrite/config.toml` on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("autonowrite").join("config.toml"))
    }

    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = lookup("LLM_PROVIDER") {
            match value.parse::<ProviderSelector>() {
                Ok(ProviderSelector::Explicit(kind)) => self.provider.env_override = Some(kind),
                Ok(ProviderSelector::Auto) => self.provider.env_override = None,
                Err(e) => warn!("Ignoring LLM_PROVIDER: {}", e),
            }
        }
        if let Some(key) = lookup("GROQ_API_KEY") {
            self.provider.groq.api_key = Some(key);
        }
        if let Some(model) = lookup("GROQ_MODEL") {
            self.provider.groq.model = model;
        }
        if let Some(host) = lookup("OLLAMA_HOST") {
            self.provider.ollama.host = host;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.provider.ollama.model = model;
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl GenerationConfig {
    /// A request for `topic` using the configured budget and threshold
    pub fn request(&self, topic: impl Into<String>) -> GenerationRequest {
        GenerationRequest::new(topic)
            .with_max_iterations(self.max_iterations)
            .with_min_quality_score(self.min_quality_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.generation.max_iterations, 3);
        assert_eq!(config.generation.min_quality_score, 8.0);
        assert_eq!(config.generation.max_tokens, 1500);
        assert_eq!(config.provider.selector, ProviderSelector::Auto);
        assert_eq!(config.provider.ollama.model, "gemma:2b");
        assert_eq!(config.provider.groq.model, "mixtral-8x7b-32768");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [generation]
            max_iterations = 5

            [provider]
            selector = "ollama"

            [provider.ollama]
            model = "llama3.2"
            pull_on_start = false
            "#,
        )
        .unwrap();

        assert_eq!(config.generation.max_iterations, 5);
        assert_eq!(config.generation.min_quality_score, 8.0);
        assert_eq!(config.provider.selector, ProviderSelector::Explicit(ProviderKind::Ollama));
        assert_eq!(config.provider.ollama.model, "llama3.2");
        assert!(!config.provider.ollama.pull_on_start);
        assert_eq!(config.provider.ollama.host, "http://localhost:11434");
        assert_eq!(config.output.results_dir, PathBuf::from("results"));
    }

    #[test]
    fn test_unknown_selector_in_file_is_an_error() {
        let parsed = toml::from_str::<AppConfig>("[provider]\nselector = \"gpt\"\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("LLM_PROVIDER", "groq"),
            ("GROQ_API_KEY", "gsk_test"),
            ("OLLAMA_HOST", "http://gpu-box:11434"),
            ("OLLAMA_MODEL", ""),
        ]);

        let mut config = AppConfig::default();
        config.apply_vars(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.provider.env_override, Some(ProviderKind::Groq));
        assert_eq!(config.provider.selector, ProviderSelector::Auto);
        assert_eq!(config.provider.groq.api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.provider.ollama.host, "http://gpu-box:11434");
        assert_eq!(config.provider.ollama.model, "gemma:2b");
    }

    #[test]
    fn test_unrecognized_env_provider_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_vars(|key| (key == "LLM_PROVIDER").then(|| "openai".to_string()));
        assert_eq!(config.provider.env_override, None);
    }

    #[test]
    fn test_generation_request_from_config() {
        let mut config = GenerationConfig::default();
        config.max_iterations = 2;
        config.min_quality_score = 7.5;
        let request = config.request("Topic");
        assert_eq!(request.max_iterations, 2);
        assert_eq!(request.min_quality_score, 7.5);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(dir.path().join("missing.toml").as_path())).is_err());
    }
}
