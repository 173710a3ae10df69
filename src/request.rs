//! Structured content requests and wizard input
//!
//! Both are ways of describing what to write in more detail than a bare
//! topic. They are reduced to a single topic string before generation.

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::generation::GenerationRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TechnicalLevel {
    Beginner,
    Intermediate,
    Advanced,
    Academic,
}

impl TechnicalLevel {
    pub fn as_str(&self) -> &str {
        match self {
            TechnicalLevel::Beginner => "beginner",
            TechnicalLevel::Intermediate => "intermediate",
            TechnicalLevel::Advanced => "advanced",
            TechnicalLevel::Academic => "academic",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "beginner" => Some(TechnicalLevel::Beginner),
            "intermediate" => Some(TechnicalLevel::Intermediate),
            "advanced" => Some(TechnicalLevel::Advanced),
            "academic" => Some(TechnicalLevel::Academic),
            _ => None,
        }
    }
}

impl fmt::Display for TechnicalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WritingTone {
    Formal,
    Informal,
    #[default]
    Academic,
    Technical,
    Persuasive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSection {
    pub knowledge_domain: String,
    pub target_audience: String,
    pub technical_level: TechnicalLevel,
    #[serde(default)]
    pub background_info: Option<String>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub assumptions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveSection {
    pub main_purpose: String,
    #[serde(default)]
    pub key_questions: Vec<String>,
    #[serde(default)]
    pub expected_outcomes: Vec<String>,
    #[serde(default)]
    pub success_metrics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeSection {
    #[serde(default)]
    pub must_include: Vec<String>,
    #[serde(default)]
    pub must_exclude: Vec<String>,
    #[serde(default)]
    pub word_count_target: Option<u32>,
    /// 1 (overview) to 5 (exhaustive)
    #[serde(default = "default_depth_level")]
    pub depth_level: u8,
    #[serde(default)]
    pub time_period: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    #[serde(default)]
    pub preferred_sources: Vec<String>,
    #[serde(default)]
    pub time_period: Option<String>,
    #[serde(default)]
    pub key_authors: Vec<String>,
    #[serde(default = "default_true")]
    pub required_citations: bool,
    #[serde(default = "default_min_sources")]
    pub min_sources: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleSection {
    #[serde(default)]
    pub writing_tone: WritingTone,
    #[serde(default)]
    pub required_sections: Vec<String>,
    #[serde(default)]
    pub formatting_guidelines: HashMap<String, serde_json::Value>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub examples: Vec<String>,
}

fn default_depth_level() -> u8 {
    2
}

fn default_true() -> bool {
    true
}

fn default_min_sources() -> u32 {
    3
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for ScopeSection {
    fn default() -> Self {
        Self {
            must_include: Vec::new(),
            must_exclude: Vec::new(),
            word_count_target: None,
            depth_level: default_depth_level(),
            time_period: None,
        }
    }
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            preferred_sources: Vec::new(),
            time_period: None,
            key_authors: Vec::new(),
            required_citations: true,
            min_sources: default_min_sources(),
        }
    }
}

impl Default for StyleSection {
    fn default() -> Self {
        Self {
            writing_tone: WritingTone::default(),
            required_sections: Vec::new(),
            formatting_guidelines: HashMap::new(),
            language: default_language(),
            examples: Vec::new(),
        }
    }
}

/// A detailed description of the content to produce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRequest {
    pub context: ContextSection,
    pub objectives: ObjectiveSection,
    #[serde(default)]
    pub scope: ScopeSection,
    #[serde(default)]
    pub sources: SourceSection,
    #[serde(default)]
    pub style: StyleSection,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ContentRequest {
    /// Read a request from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.context.knowledge_domain.trim().is_empty() {
            return Err(Error::InvalidRequest("knowledge domain is required".to_string()));
        }
        if self.objectives.main_purpose.trim().is_empty() {
            return Err(Error::InvalidRequest("main purpose is required".to_string()));
        }
        if self.sources.required_citations && self.sources.preferred_sources.is_empty() {
            return Err(Error::InvalidRequest(
                "sources are required when citations are required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn topic(&self) -> String {
        format!(
            "{} - {}",
            self.context.knowledge_domain.trim(),
            self.objectives.main_purpose.trim()
        )
    }

    /// Validate and turn into a generation request using the configured budget
    pub fn to_generation_request(&self, config: &GenerationConfig) -> Result<GenerationRequest> {
        self.validate()?;
        Ok(config.request(self.topic()))
    }
}

/// Answers collected by the project wizard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WizardData {
    #[serde(default)]
    pub project_title: Option<String>,
    #[serde(default)]
    pub knowledge_domain: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub main_purpose: Option<String>,
    #[serde(default)]
    pub technical_level: Option<String>,

    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub writing_style: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub estimated_length: Option<String>,
    #[serde(default)]
    pub output_format: Option<String>,
}

/// Presentation choices carried through to the stored result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresentationSettings {
    pub content_type: String,
    pub writing_style: String,
    pub tone: String,
    pub estimated_length: String,
    pub output_format: String,
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl WizardData {
    /// Join the wizard answers into one topic line
    pub fn topic(&self) -> String {
        let mut parts = vec![filled(&self.project_title).unwrap_or("Untitled project").to_string()];

        if let Some(domain) = filled(&self.knowledge_domain) {
            parts.push(format!("in the domain of {}", domain));
        }
        if let Some(audience) = filled(&self.target_audience) {
            parts.push(format!("for {}", audience));
        }
        if let Some(level) = filled(&self.technical_level) {
            let label = match TechnicalLevel::parse(level) {
                Some(level) => format!("{} level", level),
                None => level.to_string(),
            };
            parts.push(format!("at {}", label));
        }
        if let Some(purpose) = filled(&self.main_purpose) {
            parts.push(format!("with the goal of: {}", purpose));
        }

        parts.join(" ")
    }

    pub fn presentation(&self) -> PresentationSettings {
        let or_empty = |value: &Option<String>| filled(value).unwrap_or_default().to_string();
        PresentationSettings {
            content_type: or_empty(&self.content_type),
            writing_style: or_empty(&self.writing_style),
            tone: or_empty(&self.tone),
            estimated_length: or_empty(&self.estimated_length),
            output_format: filled(&self.output_format).unwrap_or("markdown").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ContentRequest {
        serde_json::from_value(json!({
            "context": {
                "knowledge_domain": "Distributed systems",
                "target_audience": "backend engineers",
                "technical_level": "advanced"
            },
            "objectives": { "main_purpose": "Explain consensus protocols" },
            "sources": { "preferred_sources": ["Raft paper"] }
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults_and_topic() {
        let request = sample();
        assert_eq!(request.scope.depth_level, 2);
        assert_eq!(request.sources.min_sources, 3);
        assert_eq!(request.style.writing_tone, WritingTone::Academic);
        assert!(request.validate().is_ok());
        assert_eq!(request.topic(), "Distributed systems - Explain consensus protocols");
    }

    #[test]
    fn test_validation_rules() {
        let mut request = sample();
        request.sources.preferred_sources.clear();
        assert!(request.validate().is_err());

        request.sources.required_citations = false;
        assert!(request.validate().is_ok());

        request.objectives.main_purpose = " ".to_string();
        assert!(matches!(request.validate(), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_generation_request_uses_config() {
        let config = GenerationConfig {
            max_iterations: 2,
            ..GenerationConfig::default()
        };
        let request = sample().to_generation_request(&config).unwrap();
        assert_eq!(request.max_iterations, 2);
        assert_eq!(request.topic, "Distributed systems - Explain consensus protocols");
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(&path, serde_json::to_string(&sample()).unwrap()).unwrap();

        let loaded = ContentRequest::load(&path).await.unwrap();
        assert_eq!(loaded.context.technical_level, TechnicalLevel::Advanced);
    }

    #[test]
    fn test_wizard_topic() {
        let wizard = WizardData {
            project_title: Some("Rust in production".to_string()),
            knowledge_domain: Some("software engineering".to_string()),
            target_audience: Some("team leads".to_string()),
            technical_level: Some("intermediate".to_string()),
            main_purpose: Some("assess adoption risks".to_string()),
            ..WizardData::default()
        };
        assert_eq!(
            wizard.topic(),
            "Rust in production in the domain of software engineering for team leads \
             at intermediate level with the goal of: assess adoption risks"
        );
    }

    #[test]
    fn test_wizard_topic_defaults() {
        assert_eq!(WizardData::default().topic(), "Untitled project");

        let wizard = WizardData {
            technical_level: Some("expert".to_string()),
            ..WizardData::default()
        };
        assert_eq!(wizard.topic(), "Untitled project at expert");
        assert_eq!(wizard.presentation().output_format, "markdown");
    }
}
