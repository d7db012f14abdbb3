//! Stage Runner — invokes one agent against its projection and merges the
//! result back, absorbing agent failures so the run always continues.

use std::time::Instant;

use tracing::{error, info, warn};

use crate::pipeline::context::{ContextError, WorkflowContext};
use crate::pipeline::stage::{AgentError, StageAgent, StageResult};

/// What an agent handed back for one invocation.
pub type AgentOutcome = Result<StageResult, AgentError>;

#[derive(Debug, Default, Clone, Copy)]
pub struct StageRunner;

impl StageRunner {
    /// Projects the context and calls the agent, without touching the store.
    /// `Err` only for sequencing bugs (a declared dependency is missing).
    pub async fn invoke(
        &self,
        agent: &dyn StageAgent,
        ctx: &WorkflowContext,
    ) -> Result<AgentOutcome, ContextError> {
        let stage = agent.stage();
        let projection = ctx.project(stage.dependencies())?;
        Ok(agent.execute(&projection).await)
    }

    /// Runs one stage to completion: invoke, substitute the stage default if
    /// the agent broke its contract, merge, advance `current_stage`.
    pub async fn run(
        &self,
        agent: &dyn StageAgent,
        ctx: &mut WorkflowContext,
    ) -> Result<(), ContextError> {
        let stage = agent.stage();
        info!("[{}] {} stage started", ctx.run_id(), stage);
        let started = Instant::now();

        let result = match self.invoke(agent, ctx).await? {
            Ok(result) => result,
            Err(e) => {
                error!("[{}] {e}; continuing with stage default", ctx.run_id());
                ctx.mark_failed();
                StageResult::fallback(stage, e.to_string())
            }
        };

        match result.fallback_reason() {
            Some(reason) => warn!(
                "[{}] {} stage degraded after {}ms: {}",
                ctx.run_id(),
                stage,
                started.elapsed().as_millis(),
                reason
            ),
            None => info!(
                "[{}] {} stage finished in {}ms",
                ctx.run_id(),
                stage,
                started.elapsed().as_millis()
            ),
        }

        ctx.merge(stage, result)?;
        ctx.set_current_stage(stage);
        Ok(())
    }
}
