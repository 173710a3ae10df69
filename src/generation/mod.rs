// Generation pipeline - planner, researcher, writer and critic over a pluggable backend

pub mod agents;
pub mod backend;
pub mod orchestrator;
pub mod score;
pub mod types;

pub use agents::{AgentTeam, RoleAgent};
pub use backend::{Backend, ProviderKind, ProviderSelector};
pub use orchestrator::{Orchestrator, PipelineEvent, Stage};
pub use types::*;
