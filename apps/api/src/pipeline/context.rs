//! The Context Store — the accumulated state of one résumé run.
//!
//! Sections are append-only: a stage's result is written exactly once and is
//! read-only afterwards. The store has a single writer (the runner driving
//! the current stage), so no locking is involved.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::pipeline::stage::{Stage, StageInput, StageResult};

/// One résumé submitted to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeInput {
    /// Display/identity name, normally the uploaded file name.
    pub filename: String,
    /// Where the document can be read from.
    pub path: PathBuf,
}

impl ResumeInput {
    pub fn new(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            path: path.into(),
        }
    }

    /// File name without extension, the last-resort candidate name.
    pub fn stem(&self) -> String {
        Path::new(&self.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.filename.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    /// Every stage produced real data.
    Completed,
    /// Reached the end, but at least one stage used its fallback.
    CompletedDegraded,
    /// Extraction failed, or an agent broke its contract.
    Failed,
}

impl RunStatus {
    /// Status label stored on the candidate summary.
    pub fn summary_label(&self) -> &'static str {
        match self {
            RunStatus::Completed => "Analyzed",
            RunStatus::CompletedDegraded => "Analyzed (Degraded)",
            RunStatus::InProgress | RunStatus::Failed => "Failed",
        }
    }
}

/// Sequencing bugs. Correct orchestration never produces these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("section for stage {0} already written")]
    DuplicateSection(Stage),

    #[error("section for stage {0} is required but has not been produced")]
    MissingSection(Stage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedStage {
    pub stage: Stage,
    pub reason: String,
}

#[derive(Debug)]
pub struct WorkflowContext {
    run_id: Uuid,
    input: ResumeInput,
    sections: BTreeMap<Stage, StageResult>,
    status: RunStatus,
    current_stage: Option<Stage>,
    started_at: DateTime<Utc>,
}

impl WorkflowContext {
    pub fn new(input: ResumeInput) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            input,
            sections: BTreeMap::new(),
            status: RunStatus::InProgress,
            current_stage: None,
            started_at: Utc::now(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn current_stage(&self) -> Option<Stage> {
        self.current_stage
    }

    pub fn section(&self, stage: Stage) -> Option<&StageResult> {
        self.sections.get(&stage)
    }

    /// Appends a stage's result. Never overwrites.
    pub fn merge(&mut self, stage: Stage, result: StageResult) -> Result<(), ContextError> {
        if self.sections.contains_key(&stage) {
            return Err(ContextError::DuplicateSection(stage));
        }
        self.sections.insert(stage, result);
        Ok(())
    }

    /// Copies out the named sections for a stage's input.
    pub fn project(&self, required: &[Stage]) -> Result<StageInput, ContextError> {
        let sections = required
            .iter()
            .map(|stage| {
                self.sections
                    .get(stage)
                    .map(|result| (*stage, result.to_value()))
                    .ok_or(ContextError::MissingSection(*stage))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(StageInput::new(self.input.clone(), sections))
    }

    pub fn set_current_stage(&mut self, stage: Stage) {
        self.current_stage = Some(stage);
    }

    /// Failure is sticky for the rest of the run.
    pub fn mark_failed(&mut self) {
        self.status = RunStatus::Failed;
    }

    pub fn degraded_stages(&self) -> Vec<DegradedStage> {
        self.sections
            .iter()
            .filter_map(|(stage, result)| {
                result.fallback_reason().map(|reason| DegradedStage {
                    stage: *stage,
                    reason: reason.to_string(),
                })
            })
            .collect()
    }

    /// Settles the final status and produces the report.
    pub fn finish(mut self) -> WorkflowReport {
        let degraded_stages = self.degraded_stages();
        if self.status != RunStatus::Failed {
            self.status = if degraded_stages.is_empty() {
                RunStatus::Completed
            } else {
                RunStatus::CompletedDegraded
            };
        }

        let mut take = |stage: Stage| -> Value {
            self.sections
                .remove(&stage)
                .map(|result| result.to_value())
                .unwrap_or_else(|| Value::Object(stage.default_section()))
        };

        let extraction_results = take(Stage::Extraction);
        let enhanced_profile = take(Stage::Enhancement);
        let analysis_results = take(Stage::Analysis);
        let job_matches = take(Stage::Matching);
        let screening_results = take(Stage::Screening);
        let recommendations = take(Stage::Recommendation);

        let final_recommendation = recommendations
            .get("final_recommendation")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        WorkflowReport {
            run_id: self.run_id,
            input_reference: self.input.filename,
            status: self.status,
            current_stage: self.current_stage,
            extraction_results,
            enhanced_profile,
            analysis_results,
            job_matches,
            screening_results,
            recommendations,
            final_recommendation,
            degraded_stages,
            started_at: self.started_at,
            completed_at: Utc::now(),
        }
    }
}

/// The serialized outcome of one run, as returned to callers and persisted
/// as a candidate's full report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub run_id: Uuid,
    pub input_reference: String,
    pub status: RunStatus,
    pub current_stage: Option<Stage>,
    pub extraction_results: Value,
    pub enhanced_profile: Value,
    pub analysis_results: Value,
    pub job_matches: Value,
    pub screening_results: Value,
    pub recommendations: Value,
    /// Copy of `recommendations.final_recommendation`.
    pub final_recommendation: String,
    pub degraded_stages: Vec<DegradedStage>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl WorkflowReport {
    pub fn section(&self, stage: Stage) -> &Value {
        match stage {
            Stage::Extraction => &self.extraction_results,
            Stage::Enhancement => &self.enhanced_profile,
            Stage::Analysis => &self.analysis_results,
            Stage::Matching => &self.job_matches,
            Stage::Screening => &self.screening_results,
            Stage::Recommendation => &self.recommendations,
        }
    }

    /// True when the run stopped at extraction.
    pub fn extraction_failed(&self) -> bool {
        self.status == RunStatus::Failed && self.current_stage == Some(Stage::Extraction)
    }
}
