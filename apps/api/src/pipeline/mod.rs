//! The résumé pipeline: stage contract, context store, runner, orchestrator
//! and batch coordinator.

pub mod batch;
pub mod context;
pub mod identity;
pub mod orchestrator;
pub mod runner;
pub mod stage;

pub use batch::{BatchCoordinator, BatchItemResult};
pub use context::ResumeInput;
pub use orchestrator::{PipelineError, PipelineOrchestrator, StageAgents};
pub use stage::{AgentError, Stage, StageAgent, StageInput, StageResult};
