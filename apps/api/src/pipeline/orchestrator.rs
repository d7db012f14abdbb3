//! Pipeline Orchestrator — drives the six stages in their fixed order.
//!
//! Extraction → Enhancement → Analysis → Matching → Screening → Recommendation → Done
//!
//! There is no branching and no retry here. Every stage after extraction
//! degrades softly; the one hard exit is extraction producing no usable text,
//! which ends the run with placeholder sections for every later stage.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::pipeline::context::{ContextError, ResumeInput, WorkflowContext, WorkflowReport};
use crate::pipeline::runner::StageRunner;
use crate::pipeline::stage::{Stage, StageAgent, StageResult};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline invariant violated: {0}")]
    Invariant(#[from] ContextError),

    #[error("pipeline timed out after {0}s")]
    Timeout(u64),

    #[error("pipeline panicked: {0}")]
    Panicked(String),
}

/// Anything that turns one résumé into a report. Implemented by the
/// orchestrator; the batch coordinator only depends on this.
#[async_trait]
pub trait ResumePipeline: Send + Sync {
    async fn process(&self, input: &ResumeInput) -> Result<WorkflowReport, PipelineError>;
}

/// One agent per stage. The struct shape makes a missing stage unrepresentable.
#[derive(Clone)]
pub struct StageAgents {
    pub extractor: Arc<dyn StageAgent>,
    pub enhancer: Arc<dyn StageAgent>,
    pub analyzer: Arc<dyn StageAgent>,
    pub matcher: Arc<dyn StageAgent>,
    pub screener: Arc<dyn StageAgent>,
    pub recommender: Arc<dyn StageAgent>,
}

impl StageAgents {
    pub fn for_stage(&self, stage: Stage) -> &dyn StageAgent {
        let agent = match stage {
            Stage::Extraction => &self.extractor,
            Stage::Enhancement => &self.enhancer,
            Stage::Analysis => &self.analyzer,
            Stage::Matching => &self.matcher,
            Stage::Screening => &self.screener,
            Stage::Recommendation => &self.recommender,
        };
        agent.as_ref()
    }
}

pub struct PipelineOrchestrator {
    agents: StageAgents,
    runner: StageRunner,
}

impl PipelineOrchestrator {
    pub fn new(agents: StageAgents) -> Self {
        Self {
            agents,
            runner: StageRunner,
        }
    }

    /// Runs every stage for one input and returns the final report.
    /// Stage failures are reported through `status`, never as `Err`.
    pub async fn run(&self, input: &ResumeInput) -> Result<WorkflowReport, PipelineError> {
        let mut ctx = WorkflowContext::new(input.clone());
        info!("[{}] Processing {}", ctx.run_id(), input.filename);

        for stage in Stage::ALL {
            let agent = self.agents.for_stage(stage);
            debug_assert_eq!(agent.stage(), stage, "agent wired to the wrong stage");
            self.runner.run(agent, &mut ctx).await?;

            if stage == Stage::Extraction && !has_usable_text(&ctx) {
                warn!(
                    "[{}] Extraction produced no usable text for {}; skipping remaining stages",
                    ctx.run_id(),
                    input.filename
                );
                short_circuit(&mut ctx)?;
                break;
            }
        }

        let report = ctx.finish();
        info!(
            "[{}] Finished {} with status {:?}",
            report.run_id, report.input_reference, report.status
        );
        Ok(report)
    }
}

#[async_trait]
impl ResumePipeline for PipelineOrchestrator {
    async fn process(&self, input: &ResumeInput) -> Result<WorkflowReport, PipelineError> {
        self.run(input).await
    }
}

fn has_usable_text(ctx: &WorkflowContext) -> bool {
    let Some(extraction) = ctx.section(Stage::Extraction) else {
        return false;
    };
    let failed = extraction.get("extraction_status").and_then(Value::as_str) == Some("failed");
    let text = extraction
        .get("raw_text")
        .and_then(Value::as_str)
        .unwrap_or_default();
    !failed && !text.trim().is_empty()
}

/// Hard failure: fills every later section with its empty default without
/// calling any agent. `current_stage` stays at Extraction.
fn short_circuit(ctx: &mut WorkflowContext) -> Result<(), ContextError> {
    ctx.mark_failed();
    for stage in Stage::ALL.into_iter().skip(1) {
        ctx.merge(
            stage,
            StageResult::fallback(stage, "skipped: extraction failed"),
        )?;
    }
    Ok(())
}
