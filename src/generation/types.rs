// Core types for the generation pipeline

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_MAX_ITERATIONS: u32 = 3;
pub const DEFAULT_MIN_QUALITY_SCORE: f64 = 8.0;

/// Input to a single orchestrator run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    pub topic: String,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_min_quality_score")]
    pub min_quality_score: f64,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_min_quality_score() -> f64 {
    DEFAULT_MIN_QUALITY_SCORE
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            min_quality_score: DEFAULT_MIN_QUALITY_SCORE,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_min_quality_score(mut self, min_quality_score: f64) -> Self {
        self.min_quality_score = min_quality_score;
        self
    }

    /// Reject requests that would skip the draft/critique cycle or can never be judged
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(Error::InvalidRequest("topic must not be empty".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidRequest(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(0.0..=10.0).contains(&self.min_quality_score) {
            return Err(Error::InvalidRequest(format!(
                "min_quality_score must be within 0-10, got {}",
                self.min_quality_score
            )));
        }
        Ok(())
    }
}

/// Pipeline roles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Planner,
    Researcher,
    Writer,
    Critic,
}

impl AgentRole {
    pub const ALL: [AgentRole; 4] = [
        AgentRole::Planner,
        AgentRole::Researcher,
        AgentRole::Writer,
        AgentRole::Critic,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            AgentRole::Planner => "planner",
            AgentRole::Researcher => "researcher",
            AgentRole::Writer => "writer",
            AgentRole::Critic => "critic",
        }
    }

    /// First line of every prompt built for this role
    pub fn header(&self) -> &'static str {
        match self {
            AgentRole::Planner => "ROLE: STRATEGIC PLANNER",
            AgentRole::Researcher => "ROLE: ACADEMIC RESEARCHER",
            AgentRole::Writer => "ROLE: PROFESSIONAL WRITER",
            AgentRole::Critic => "ROLE: RIGOROUS CRITIC",
        }
    }

    /// Recover the role from a prompt's header line
    pub fn from_header(line: &str) -> Option<Self> {
        let line = line.trim();
        Self::ALL.into_iter().find(|role| role.header() == line)
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single backend call produced
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Ok(String),
    Degraded { text: String, cause: String },
}

impl GenerationOutcome {
    pub fn degraded(provider: &str, cause: impl fmt::Display) -> Self {
        let cause = cause.to_string();
        Self::Degraded {
            text: format!("[{} generation failed: {}]", provider, cause),
            cause,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            GenerationOutcome::Ok(text) => text,
            GenerationOutcome::Degraded { text, .. } => text,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, GenerationOutcome::Degraded { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskMetadata {
    pub prompt_length: usize,
    pub response_length: usize,
    pub context_provided: bool,
}

/// Output of one agent invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub role: AgentRole,
    pub content: String,
    pub metadata: TaskMetadata,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

impl TaskResult {
    pub fn from_outcome(
        role: AgentRole,
        outcome: GenerationOutcome,
        prompt_length: usize,
        context_provided: bool,
    ) -> Self {
        let (content, fault) = match outcome {
            GenerationOutcome::Ok(text) => (text, None),
            GenerationOutcome::Degraded { text, cause } => (text, Some(cause)),
        };

        Self {
            role,
            metadata: TaskMetadata {
                prompt_length,
                response_length: content.chars().count(),
                context_provided,
            },
            content,
            timestamp: Utc::now(),
            success: fault.is_none(),
            fault,
        }
    }
}

/// One iteration's judgement by the critic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriticEvaluation {
    pub iteration: u32,
    pub content: String,
    pub score: f64,
    /// Whether this evaluation met the stopping policy
    pub accepted: bool,
    /// The critic call itself failed and the score is the low-confidence fallback
    #[serde(default)]
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderInfo {
    #[serde(rename = "type")]
    pub provider_type: String,
    pub model: String,
}

/// Final output of an orchestrator run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub topic: String,
    pub final_content: String,
    pub plan: String,
    pub research: String,
    pub critic_history: Vec<CriticEvaluation>,
    pub final_score: f64,
    pub iterations_used: u32,
    pub max_iterations: u32,
    pub approved: bool,
    pub llm_calls: u32,
    pub execution_time_seconds: f64,
    pub provider_info: ProviderInfo,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = GenerationRequest::new("Rust ownership");
        assert_eq!(request.max_iterations, 3);
        assert_eq!(request.min_quality_score, 8.0);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let request = GenerationRequest::new("topic").with_max_iterations(0);
        assert!(matches!(request.validate(), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_blank_topic_and_bad_score_rejected() {
        assert!(GenerationRequest::new("   ").validate().is_err());
        assert!(GenerationRequest::new("t").with_min_quality_score(11.0).validate().is_err());
        assert!(GenerationRequest::new("t").with_min_quality_score(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_role_header_round_trip() {
        for role in AgentRole::ALL {
            assert_eq!(AgentRole::from_header(role.header()), Some(role));
        }
        assert_eq!(AgentRole::from_header("ROLE: JUGGLER"), None);
    }

    #[test]
    fn test_degraded_outcome_marks_task_failed() {
        let outcome = GenerationOutcome::degraded("groq", "connection reset");
        assert!(outcome.is_degraded());
        assert!(outcome.text().contains("connection reset"));

        let result = TaskResult::from_outcome(AgentRole::Writer, outcome, 42, true);
        assert!(!result.success);
        assert_eq!(result.fault.as_deref(), Some("connection reset"));
        assert_eq!(result.metadata.prompt_length, 42);
        assert!(result.metadata.context_provided);
    }

    #[test]
    fn test_provider_info_serializes_type_key() {
        let info = ProviderInfo {
            provider_type: "simulation".to_string(),
            model: "simulated".to_string(),
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["type"], "simulation");
        assert_eq!(value["model"], "simulated");
    }
}
