// Role agents - one template-driven backend call per task

mod prompts;

pub use prompts::NOT_PROVIDED;

use super::backend::{Backend, DEFAULT_MAX_TOKENS};
use super::types::{AgentRole, GenerationOutcome, TaskResult};
use tracing::{debug, warn};

/// A single pipeline role bound to its prompt template
pub struct RoleAgent {
    role: AgentRole,
    max_tokens: u32,
    history: Vec<TaskResult>,
}

impl RoleAgent {
    pub fn new(role: AgentRole) -> Self {
        Self::with_max_tokens(role, DEFAULT_MAX_TOKENS)
    }

    pub fn with_max_tokens(role: AgentRole, max_tokens: u32) -> Self {
        Self {
            role,
            max_tokens,
            history: Vec::new(),
        }
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// Every result this agent produced, oldest first
    pub fn history(&self) -> &[TaskResult] {
        &self.history
    }

    pub fn build_prompt(&self, task: &str, context: Option<&str>) -> String {
        prompts::build(self.role, task, context)
    }

    /// Run one task. Backend failures become a degraded result instead of an error.
    pub async fn execute(
        &mut self,
        backend: &dyn Backend,
        task: &str,
        context: Option<&str>,
    ) -> TaskResult {
        let prompt = self.build_prompt(task, context);
        let prompt_length = prompt.chars().count();
        debug!("{} prompt: {} chars", self.role, prompt_length);

        let outcome = match backend.generate(&prompt, self.max_tokens).await {
            Ok(text) => GenerationOutcome::Ok(text),
            Err(e) => {
                warn!("{} call to {} failed: {}", self.role, backend.provider_type(), e);
                GenerationOutcome::degraded(backend.provider_type(), e)
            }
        };

        let result = TaskResult::from_outcome(self.role, outcome, prompt_length, context.is_some());
        debug!("{} response: {} chars", self.role, result.metadata.response_length);

        self.history.push(result.clone());
        result
    }
}

/// The four agents of one pipeline
pub struct AgentTeam {
    pub planner: RoleAgent,
    pub researcher: RoleAgent,
    pub writer: RoleAgent,
    pub critic: RoleAgent,
}

impl AgentTeam {
    pub fn new(max_tokens: u32) -> Self {
        Self {
            planner: RoleAgent::with_max_tokens(AgentRole::Planner, max_tokens),
            researcher: RoleAgent::with_max_tokens(AgentRole::Researcher, max_tokens),
            writer: RoleAgent::with_max_tokens(AgentRole::Writer, max_tokens),
            critic: RoleAgent::with_max_tokens(AgentRole::Critic, max_tokens),
        }
    }
}

impl Default for AgentTeam {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS)
    }
}
