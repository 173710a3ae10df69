//! Tracked executions
//!
//! An [`ExecutionRecord`] follows one generation from start to finish:
//! status transitions, clamped progress and a leveled log. [`execute`] runs
//! an orchestrator against a record and streams pipeline events into it.

use crate::config::{AppConfig, ProviderConfig};
use crate::error::Result;
use crate::generation::backend::{self, Backend, SimulationBackend};
use crate::generation::{GenerationRequest, GenerationResult, Orchestrator, PipelineEvent, Stage};
use crate::request::{PresentationSettings, WizardData};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Generation output as stored alongside the wizard's presentation choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResult {
    #[serde(flatten)]
    pub generation: GenerationResult,
    pub wizard_config: PresentationSettings,
    pub metadata: ResultMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub generated_at: DateTime<Utc>,
    pub system_version: String,
    pub agent_system: String,
}

impl StoredResult {
    pub fn new(generation: GenerationResult, wizard_config: PresentationSettings) -> Self {
        Self {
            generation,
            wizard_config,
            metadata: ResultMetadata {
                generated_at: Utc::now(),
                system_version: env!("CARGO_PKG_VERSION").to_string(),
                agent_system: "AutonoWrite multi-agent".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub status: ExecutionStatus,
    /// Always within [0, 1]
    pub progress: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub logs: Vec<ExecutionLog>,
    pub result: Option<StoredResult>,
    pub error: Option<String>,
}

impl ExecutionRecord {
    pub fn new() -> Self {
        Self {
            status: ExecutionStatus::Pending,
            progress: 0.0,
            started_at: None,
            completed_at: None,
            logs: Vec::new(),
            result: None,
            error: None,
        }
    }

    pub fn start(&mut self) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        self.add_log(LogLevel::Info, "Execution started");
    }

    pub fn update_progress(&mut self, progress: f64) {
        if progress.is_nan() {
            return;
        }
        self.progress = progress.clamp(0.0, 1.0);
    }

    /// Append a log entry and mirror it to tracing
    pub fn add_log(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Debug => debug!("{}", message),
            LogLevel::Info => info!("{}", message),
            LogLevel::Warning => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
        }
        self.logs.push(ExecutionLog {
            timestamp: Utc::now(),
            level,
            message,
        });
    }

    pub fn complete(&mut self, result: StoredResult) {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.progress = 1.0;
        self.add_log(LogLevel::Info, "Content generation completed");
        self.result = Some(result);
    }

    pub fn fail(&mut self, error: impl fmt::Display) {
        let error = error.to_string();
        self.status = ExecutionStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.add_log(LogLevel::Error, format!("Generation failed: {}", error));
        self.error = Some(error);
    }

    /// Cancel a pending or running execution. Returns false if it already finished.
    pub fn cancel(&mut self) -> bool {
        if !matches!(self.status, ExecutionStatus::Pending | ExecutionStatus::Running) {
            return false;
        }
        self.status = ExecutionStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        self.add_log(LogLevel::Warning, "Execution was cancelled");
        true
    }

    /// Whole seconds between start and completion (or now)
    pub fn duration_secs(&self) -> u64 {
        let Some(started) = self.started_at else {
            return 0;
        };
        let end = self.completed_at.unwrap_or_else(Utc::now);
        (end - started).num_seconds().max(0) as u64
    }

    /// `HH:MM:SS`
    pub fn elapsed(&self) -> String {
        let total = self.duration_secs();
        format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
    }

    /// Fold a pipeline event into progress and log
    pub fn apply(&mut self, event: &PipelineEvent) {
        self.update_progress(event.progress());
        match event {
            PipelineEvent::Started { topic, provider, .. } => {
                self.add_log(LogLevel::Info, format!("Pipeline started for '{}' on {}", topic, provider));
            }
            PipelineEvent::StageCompleted { stage, success, .. } => {
                let name = match stage {
                    Stage::Planning => "Planning".to_string(),
                    Stage::Researching => "Research".to_string(),
                    Stage::Drafting(i) => format!("Draft {}", i),
                    Stage::Critiquing(i) => format!("Critique {}", i),
                    Stage::Done => "Pipeline".to_string(),
                };
                if *success {
                    self.add_log(LogLevel::Info, format!("{} completed", name));
                } else {
                    self.add_log(LogLevel::Warning, format!("{} completed with a degraded response", name));
                }
            }
            PipelineEvent::IterationScored { iteration, score, accepted, .. } => {
                let verdict = if *accepted { "approved" } else { "needs revision" };
                self.add_log(
                    LogLevel::Info,
                    format!("Iteration {} scored {:.1}/10, {}", iteration, score, verdict),
                );
            }
            PipelineEvent::Finished { approved, final_score, .. } => {
                self.add_log(
                    LogLevel::Info,
                    format!("Pipeline finished with score {:.1}/10 (approved: {})", final_score, approved),
                );
            }
        }
    }
}

impl Default for ExecutionRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the configured backend, degrading to the simulator on failure
pub async fn connect_or_simulate(config: &ProviderConfig) -> Arc<dyn Backend> {
    match backend::select(config.selector, config).await {
        Ok(backend) => backend,
        Err(e) => {
            warn!("Provider '{}' unavailable, using simulation: {}", config.selector, e);
            Arc::new(SimulationBackend::new())
        }
    }
}

/// Run `request` while recording progress and logs into `record`
pub async fn execute(
    orchestrator: &mut Orchestrator,
    request: GenerationRequest,
    record: &mut ExecutionRecord,
    presentation: PresentationSettings,
) -> Result<StoredResult> {
    record.start();
    let info = orchestrator.provider_info();
    record.add_log(
        LogLevel::Info,
        format!("Provider selected: {} ({})", info.provider_type, info.model),
    );
    record.add_log(LogLevel::Info, format!("Topic: {}", request.topic));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let run = orchestrator.run_with_events(request, tx);
    let drain = async {
        while let Some(event) = rx.recv().await {
            record.apply(&event);
        }
    };
    let (outcome, ()) = tokio::join!(run, drain);

    match outcome {
        Ok(generation) => {
            let stored = StoredResult::new(generation, presentation);
            record.complete(stored.clone());
            Ok(stored)
        }
        Err(e) => {
            record.fail(&e);
            Err(e)
        }
    }
}

/// Generate content for a wizard submission with the configured provider and budget
pub async fn generate_for_wizard(
    config: &AppConfig,
    wizard: &WizardData,
    record: &mut ExecutionRecord,
) -> Result<StoredResult> {
    let backend = connect_or_simulate(&config.provider).await;
    let mut orchestrator = Orchestrator::with_max_tokens(backend, config.generation.max_tokens);
    let request = config.generation.request(wizard.topic());
    execute(&mut orchestrator, request, record, wizard.presentation()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::generation::{ProviderKind, ProviderSelector};
    use chrono::Duration;

    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.provider.ollama.host = "http://127.0.0.1:9".to_string();
        config.provider.ollama.probe_timeout_ms = 300;
        config.provider.request_timeout_secs = 1;
        config
    }

    #[test]
    fn test_progress_is_clamped() {
        let mut record = ExecutionRecord::new();
        record.update_progress(1.7);
        assert_eq!(record.progress, 1.0);
        record.update_progress(-0.2);
        assert_eq!(record.progress, 0.0);
        record.update_progress(f64::NAN);
        assert_eq!(record.progress, 0.0);
    }

    #[test]
    fn test_elapsed_format() {
        let mut record = ExecutionRecord::new();
        assert_eq!(record.elapsed(), "00:00:00");

        let now = Utc::now();
        record.started_at = Some(now - Duration::seconds(3725));
        record.completed_at = Some(now);
        assert_eq!(record.elapsed(), "01:02:05");
        assert_eq!(record.duration_secs(), 3725);
    }

    #[test]
    fn test_cancel_only_while_active() {
        let mut record = ExecutionRecord::new();
        record.start();
        assert!(record.cancel());
        assert_eq!(record.status, ExecutionStatus::Cancelled);
        assert!(!record.cancel());
        assert_eq!(record.logs.last().map(|l| l.level), Some(LogLevel::Warning));
    }

    #[tokio::test]
    async fn test_execute_with_simulation() {
        let mut orchestrator = Orchestrator::new(Arc::new(SimulationBackend::new()));
        let mut record = ExecutionRecord::new();
        let wizard = WizardData {
            project_title: Some("Agents".to_string()),
            tone: Some("neutral".to_string()),
            ..WizardData::default()
        };

        let stored = execute(
            &mut orchestrator,
            GenerationRequest::new(wizard.topic()).with_max_iterations(1),
            &mut record,
            wizard.presentation(),
        )
        .await
        .unwrap();

        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(record.progress, 1.0);
        assert!(record.logs.iter().any(|l| l.message.contains("Iteration 1 scored 7.8/10")));
        assert_eq!(stored.generation.llm_calls, 4);
        assert_eq!(stored.wizard_config.tone, "neutral");

        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["topic"], "Agents");
        assert_eq!(value["wizard_config"]["output_format"], "markdown");
        assert_eq!(value["metadata"]["agent_system"], "AutonoWrite multi-agent");
    }

    #[tokio::test]
    async fn test_execute_invalid_request_fails_record() {
        let mut orchestrator = Orchestrator::new(Arc::new(SimulationBackend::new()));
        let mut record = ExecutionRecord::new();

        let result = execute(
            &mut orchestrator,
            GenerationRequest::new("Topic").with_max_iterations(0),
            &mut record,
            WizardData::default().presentation(),
        )
        .await;

        assert!(matches!(result, Err(Error::InvalidRequest(_))));
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert!(record.error.is_some());
    }

    #[tokio::test]
    async fn test_unavailable_explicit_provider_degrades_to_simulation() {
        let mut config = offline_config();
        config.provider.selector = ProviderSelector::Explicit(ProviderKind::Ollama);
        let backend = connect_or_simulate(&config.provider).await;
        assert_eq!(backend.provider_type(), "simulation");
    }

    #[tokio::test]
    async fn test_generate_for_wizard() {
        let mut config = offline_config();
        config.generation.max_iterations = 1;
        let mut record = ExecutionRecord::new();

        let stored = generate_for_wizard(&config, &WizardData::default(), &mut record)
            .await
            .unwrap();
        assert_eq!(stored.generation.topic, "Untitled project");
        assert_eq!(stored.generation.provider_info.provider_type, "simulation");
        assert_eq!(record.status, ExecutionStatus::Completed);
    }
}
