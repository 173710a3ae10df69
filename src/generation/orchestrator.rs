// Orchestrator - drives planner, researcher and the writer/critic refinement loop

use super::agents::AgentTeam;
use super::backend::{Backend, DEFAULT_MAX_TOKENS};
use super::score::{LOW_CONFIDENCE_SCORE, Verdict, extract_score};
use super::types::{CriticEvaluation, GenerationRequest, GenerationResult, ProviderInfo, TaskResult};
use crate::error::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

const PLANNED_PROGRESS: f64 = 0.10;
const RESEARCHED_PROGRESS: f64 = 0.20;
const REFINEMENT_SPAN: f64 = 0.70;

/// Pipeline position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "iteration", rename_all = "snake_case")]
pub enum Stage {
    Planning,
    Researching,
    Drafting(u32),
    Critiquing(u32),
    Done,
}

/// Progress notifications emitted while a run advances
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Started {
        topic: String,
        max_iterations: u32,
        provider: String,
        progress: f64,
    },
    StageCompleted {
        stage: Stage,
        success: bool,
        progress: f64,
    },
    IterationScored {
        iteration: u32,
        score: f64,
        accepted: bool,
        progress: f64,
    },
    Finished {
        approved: bool,
        final_score: f64,
        iterations_used: u32,
        progress: f64,
    },
}

impl PipelineEvent {
    /// Fraction of the run completed, in [0, 1]
    pub fn progress(&self) -> f64 {
        match self {
            PipelineEvent::Started { progress, .. }
            | PipelineEvent::StageCompleted { progress, .. }
            | PipelineEvent::IterationScored { progress, .. }
            | PipelineEvent::Finished { progress, .. } => *progress,
        }
    }
}

/// Everything accumulated while a single run is in flight
struct RunState {
    started: Instant,
    plan: String,
    research: String,
    draft: String,
    critiques: Vec<CriticEvaluation>,
    approved: bool,
    calls: u32,
}

impl RunState {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            plan: String::new(),
            research: String::new(),
            draft: String::new(),
            critiques: Vec::new(),
            approved: false,
            calls: 0,
        }
    }

    fn into_result(self, request: &GenerationRequest, provider_info: ProviderInfo) -> Result<GenerationResult> {
        let last = self
            .critiques
            .last()
            .ok_or(Error::IncompleteRun("run finished without a critique"))?;

        Ok(GenerationResult {
            topic: request.topic.clone(),
            final_score: last.score,
            iterations_used: last.iteration,
            final_content: self.draft,
            plan: self.plan,
            research: self.research,
            max_iterations: request.max_iterations,
            approved: self.approved,
            llm_calls: self.calls,
            execution_time_seconds: self.started.elapsed().as_secs_f64(),
            provider_info,
            timestamp: Utc::now(),
            critic_history: self.critiques,
        })
    }
}

/// Runs the four-role pipeline against one backend
pub struct Orchestrator {
    backend: Arc<dyn Backend>,
    agents: AgentTeam,
    history: Vec<GenerationResult>,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_max_tokens(backend, DEFAULT_MAX_TOKENS)
    }

    pub fn with_max_tokens(backend: Arc<dyn Backend>, max_tokens: u32) -> Self {
        Self {
            backend,
            agents: AgentTeam::new(max_tokens),
            history: Vec::new(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn agents(&self) -> &AgentTeam {
        &self.agents
    }

    /// Results of every completed run, oldest first
    pub fn history(&self) -> &[GenerationResult] {
        &self.history
    }

    pub fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            provider_type: self.backend.provider_type().to_string(),
            model: self.backend.model_name().to_string(),
        }
    }

    pub async fn run(&mut self, request: GenerationRequest) -> Result<GenerationResult> {
        self.drive(request, None).await
    }

    /// Same as `run`, reporting progress on `events`. A closed receiver is ignored.
    pub async fn run_with_events(
        &mut self,
        request: GenerationRequest,
        events: UnboundedSender<PipelineEvent>,
    ) -> Result<GenerationResult> {
        self.drive(request, Some(&events)).await
    }

    async fn drive(
        &mut self,
        request: GenerationRequest,
        events: Option<&UnboundedSender<PipelineEvent>>,
    ) -> Result<GenerationResult> {
        request.validate()?;

        let provider_info = self.provider_info();
        info!(
            "Starting run for '{}' ({} iterations max, {} / {})",
            request.topic, request.max_iterations, provider_info.provider_type, provider_info.model
        );
        emit(events, PipelineEvent::Started {
            topic: request.topic.clone(),
            max_iterations: request.max_iterations,
            provider: provider_info.provider_type.clone(),
            progress: 0.0,
        });

        let mut state = RunState::new();
        let mut stage = Stage::Planning;
        while stage != Stage::Done {
            stage = self.step(stage, &request, &mut state, events).await;
        }

        let result = state.into_result(&request, provider_info)?;
        info!(
            "Run finished: score {:.1}, {} iteration(s), approved: {}, {} call(s)",
            result.final_score, result.iterations_used, result.approved, result.llm_calls
        );
        emit(events, PipelineEvent::Finished {
            approved: result.approved,
            final_score: result.final_score,
            iterations_used: result.iterations_used,
            progress: 1.0,
        });

        self.history.push(result.clone());
        Ok(result)
    }

    /// Execute one stage and return the next
    async fn step(
        &mut self,
        stage: Stage,
        request: &GenerationRequest,
        state: &mut RunState,
        events: Option<&UnboundedSender<PipelineEvent>>,
    ) -> Stage {
        let backend = self.backend.as_ref();
        let max = request.max_iterations;

        match stage {
            Stage::Planning => {
                info!("Planning");
                let task = format!("Create a structured plan for an article about: {}", request.topic);
                let result = self.agents.planner.execute(backend, &task, None).await;
                state.calls += 1;
                stage_completed(events, stage, &result, PLANNED_PROGRESS);
                state.plan = result.content;
                Stage::Researching
            }
            Stage::Researching => {
                info!("Researching");
                let task = format!("Research detailed information about: {}", request.topic);
                let result = self
                    .agents
                    .researcher
                    .execute(backend, &task, Some(state.plan.as_str()))
                    .await;
                state.calls += 1;
                stage_completed(events, stage, &result, RESEARCHED_PROGRESS);
                state.research = result.content;
                Stage::Drafting(1)
            }
            Stage::Drafting(iteration) => {
                info!("Drafting iteration {}/{}", iteration, max);
                let (task, context) = match state.critiques.last() {
                    None => (
                        format!("Write a complete article about: {}", request.topic),
                        format!("PLAN:\n{}\n\nRESEARCH:\n{}", state.plan, state.research),
                    ),
                    Some(feedback) => (
                        format!("Revise and improve this text:\n\n{}", state.draft),
                        format!("PREVIOUS FEEDBACK:\n{}", feedback.content),
                    ),
                };
                let result = self.agents.writer.execute(backend, &task, Some(context.as_str())).await;
                state.calls += 1;
                let progress = refinement_progress(f64::from(iteration) - 0.5, max);
                stage_completed(events, stage, &result, progress);
                state.draft = result.content;
                Stage::Critiquing(iteration)
            }
            Stage::Critiquing(iteration) => {
                info!("Critiquing iteration {}/{}", iteration, max);
                let result = self.agents.critic.execute(backend, &state.draft, None).await;
                state.calls += 1;

                let degraded = !result.success;
                let (score, accepted) = if degraded {
                    (LOW_CONFIDENCE_SCORE, false)
                } else {
                    let score = extract_score(&result.content);
                    let accepted = Verdict::scan(&result.content).accepts() && score >= request.min_quality_score;
                    (score, accepted)
                };

                if accepted {
                    info!("Approved at iteration {} with score {:.1}", iteration, score);
                } else if degraded {
                    warn!("Critic call failed at iteration {}, scoring {:.1}", iteration, score);
                } else {
                    info!("Score {:.1} at iteration {}, revision needed", score, iteration);
                }

                let progress = refinement_progress(f64::from(iteration), max);
                emit(events, PipelineEvent::IterationScored {
                    iteration,
                    score,
                    accepted,
                    progress,
                });
                state.critiques.push(CriticEvaluation {
                    iteration,
                    content: result.content,
                    score,
                    accepted,
                    degraded,
                });

                if accepted {
                    state.approved = true;
                    Stage::Done
                } else if iteration >= max {
                    Stage::Done
                } else {
                    Stage::Drafting(iteration + 1)
                }
            }
            Stage::Done => Stage::Done,
        }
    }
}

fn refinement_progress(iterations: f64, max: u32) -> f64 {
    RESEARCHED_PROGRESS + REFINEMENT_SPAN * iterations / f64::from(max)
}

fn stage_completed(
    events: Option<&UnboundedSender<PipelineEvent>>,
    stage: Stage,
    result: &TaskResult,
    progress: f64,
) {
    emit(events, PipelineEvent::StageCompleted {
        stage,
        success: result.success,
        progress,
    });
}

fn emit(events: Option<&UnboundedSender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}
