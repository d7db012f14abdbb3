//! Batch Coordinator — bulk ingestion with duplicate detection and per-item
//! failure isolation.
//!
//! Items run one at a time. For each: check the normalized filename against
//! everything already persisted, run the pipeline under a timeout, resolve
//! the candidate's identity, persist the summary. Any error is caught at the
//! item boundary and recorded as that item's `Failed` outcome.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinError;
use tracing::{error, info};

use crate::models::candidate::CandidateSummary;
use crate::pipeline::context::{ResumeInput, WorkflowReport};
use crate::pipeline::identity::resolve_identity;
use crate::pipeline::orchestrator::{PipelineError, ResumePipeline};
use crate::pipeline::stage::Stage;
use crate::store::CandidateStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum BatchItemOutcome {
    Analyzed {
        id: i64,
        candidate: CandidateSummary,
    },
    #[serde(rename = "Skipped-Duplicate")]
    SkippedDuplicate,
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItemResult {
    pub filename: String,
    #[serde(flatten)]
    pub outcome: BatchItemOutcome,
}

pub struct BatchCoordinator {
    pipeline: Arc<dyn ResumePipeline>,
    store: Arc<dyn CandidateStore>,
    item_timeout: Duration,
}

impl BatchCoordinator {
    pub fn new(
        pipeline: Arc<dyn ResumePipeline>,
        store: Arc<dyn CandidateStore>,
        item_timeout: Duration,
    ) -> Self {
        Self {
            pipeline,
            store,
            item_timeout,
        }
    }

    /// One result per input, in input order. Never fails as a whole.
    pub async fn process_batch(&self, inputs: &[ResumeInput]) -> Vec<BatchItemResult> {
        let mut results = Vec::with_capacity(inputs.len());

        for input in inputs {
            let outcome = match self.process_item(input).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Batch item {} failed: {e:#}", input.filename);
                    BatchItemOutcome::Failed {
                        error: format!("{e:#}"),
                    }
                }
            };
            results.push(BatchItemResult {
                filename: input.filename.clone(),
                outcome,
            });
        }

        info!(
            "Batch finished: {} items, {} analyzed",
            results.len(),
            results
                .iter()
                .filter(|r| matches!(r.outcome, BatchItemOutcome::Analyzed { .. }))
                .count()
        );
        results
    }

    async fn process_item(&self, input: &ResumeInput) -> Result<BatchItemOutcome> {
        // Asked per item: a file persisted earlier in this batch counts too.
        if self.store.filename_exists(&input.filename).await? {
            info!("Skipping duplicate {}", input.filename);
            return Ok(BatchItemOutcome::SkippedDuplicate);
        }

        // Own task per item so a panicking agent surfaces as a JoinError here
        // instead of unwinding through the whole batch.
        let pipeline = self.pipeline.clone();
        let owned = input.clone();
        let mut run = tokio::spawn(async move { pipeline.process(&owned).await });

        let report = match tokio::time::timeout(self.item_timeout, &mut run).await {
            Ok(Ok(report)) => report?,
            Ok(Err(e)) => return Err(PipelineError::Panicked(panic_message(e)).into()),
            Err(_) => {
                run.abort();
                return Err(PipelineError::Timeout(self.item_timeout.as_secs()).into());
            }
        };

        let candidate = summarize(input, &report)?;
        let id = self.store.add_candidate(&candidate).await?;
        Ok(BatchItemOutcome::Analyzed { id, candidate })
    }
}

/// Projects a finished run onto the persisted candidate summary.
pub fn summarize(input: &ResumeInput, report: &WorkflowReport) -> Result<CandidateSummary> {
    let identity = resolve_identity(
        report
            .section(Stage::Extraction)
            .get("structured_data")
            .unwrap_or(&Value::Null),
        &input.stem(),
    );

    let recommendation = report
        .section(Stage::Recommendation)
        .get("recommendation")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("N/A")
        .to_string();

    Ok(CandidateSummary {
        filename: input.filename.clone(),
        name: identity.name,
        email: identity.email,
        phone: identity.phone,
        score: screening_score(report.section(Stage::Screening)),
        recommendation,
        full_report: serde_json::to_value(report).context("Failed to serialize report")?,
        status: report.status.summary_label().to_string(),
    })
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string()),
        Err(err) => err.to_string(),
    }
}

fn screening_score(screening: &Value) -> f64 {
    match screening.get("screening_score") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
