//! The stage contract: the fixed stage order, each stage's declared inputs
//! and documented default, and the trait every stage agent implements.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::pipeline::context::ResumeInput;

/// One step of the pipeline. Declaration order is execution order, and the
/// derived `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Extraction,
    Enhancement,
    Analysis,
    Matching,
    Screening,
    Recommendation,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Extraction,
        Stage::Enhancement,
        Stage::Analysis,
        Stage::Matching,
        Stage::Screening,
        Stage::Recommendation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Extraction => "Extraction",
            Stage::Enhancement => "Enhancement",
            Stage::Analysis => "Analysis",
            Stage::Matching => "Matching",
            Stage::Screening => "Screening",
            Stage::Recommendation => "Recommendation",
        }
    }

    /// Key under which this stage's result appears in the final report.
    pub fn section_key(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction_results",
            Stage::Enhancement => "enhanced_profile",
            Stage::Analysis => "analysis_results",
            Stage::Matching => "job_matches",
            Stage::Screening => "screening_results",
            Stage::Recommendation => "recommendations",
        }
    }

    /// Sections a stage may read. Every dependency precedes the stage.
    pub fn dependencies(&self) -> &'static [Stage] {
        match self {
            Stage::Extraction => &[],
            Stage::Enhancement => &[Stage::Extraction],
            Stage::Analysis => &[Stage::Extraction, Stage::Enhancement],
            Stage::Matching => &[Stage::Analysis],
            Stage::Screening => &[Stage::Extraction, Stage::Analysis, Stage::Matching],
            Stage::Recommendation => &[
                Stage::Extraction,
                Stage::Enhancement,
                Stage::Analysis,
                Stage::Matching,
                Stage::Screening,
            ],
        }
    }

    /// The stage's statically known default. Used as the fallback when the
    /// backend or parsing fails, and as the empty placeholder when the run
    /// short-circuits before the stage is reached.
    pub fn default_section(&self) -> Map<String, Value> {
        let value = match self {
            Stage::Extraction => json!({
                "raw_text": "",
                "structured_data": {},
                "extraction_status": "failed"
            }),
            Stage::Enhancement => json!({
                "enhanced_summary": "",
                "standardized_skills": [],
                "total_years_exp": 0
            }),
            Stage::Analysis => json!({
                "technical_skills": [],
                "years_of_experience": 0,
                "education": {"level": "Unknown", "field": "Unknown"},
                "experience_level": "Junior",
                "key_achievements": [],
                "domain_expertise": []
            }),
            Stage::Matching => json!({
                "matched_jobs": [],
                "number_of_matches": 0
            }),
            Stage::Screening => json!({
                "screening_report": "No report generated",
                "screening_score": 0,
                "red_flags": [],
                "screening_status": "Pending Review"
            }),
            Stage::Recommendation => json!({
                "recommendation": "Pending Review",
                "final_recommendation": "No recommendation available",
                "next_steps": [],
                "confidence_level": "low"
            }),
        };
        into_object(value)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// What a stage agent hands back: structured data plus, when the stage had
/// to degrade, the reason. The reason is kept beside the data so a fallback
/// result's data is exactly the stage's documented default.
#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    data: Map<String, Value>,
    fallback_reason: Option<String>,
}

impl StageResult {
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            data,
            fallback_reason: None,
        }
    }

    /// The stage's default, tagged as a fallback.
    pub fn fallback(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            data: stage.default_section(),
            fallback_reason: Some(reason.into()),
        }
    }

    /// Keeps partially useful data but records that the stage degraded.
    pub fn degraded(mut self, reason: impl Into<String>) -> Self {
        self.fallback_reason = Some(reason.into());
        self
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        self.fallback_reason.as_deref()
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone())
    }
}

/// Read-only view of the sections a stage declared it depends on.
#[derive(Debug, Clone)]
pub struct StageInput {
    pub input: ResumeInput,
    sections: BTreeMap<Stage, Value>,
}

impl StageInput {
    pub(crate) fn new(input: ResumeInput, sections: BTreeMap<Stage, Value>) -> Self {
        Self { input, sections }
    }

    /// Section data, or `Null` when the stage did not declare it.
    pub fn section(&self, stage: Stage) -> &Value {
        static NULL: Value = Value::Null;
        self.sections.get(&stage).unwrap_or(&NULL)
    }

    pub fn field(&self, stage: Stage, key: &str) -> Option<&Value> {
        self.section(stage).get(key)
    }

    pub fn str_field(&self, stage: Stage, key: &str) -> &str {
        self.field(stage, key).and_then(Value::as_str).unwrap_or("")
    }

    /// The projected sections keyed by report section name, for prompting.
    pub fn sections_json(&self) -> Result<String, serde_json::Error> {
        let view: Map<String, Value> = self
            .sections
            .iter()
            .map(|(stage, value)| (stage.section_key().to_string(), value.clone()))
            .collect();
        serde_json::to_string_pretty(&view)
    }
}

/// Raised only when an agent breaks its contract of always returning data.
#[derive(Debug, Error)]
#[error("{stage} agent failed: {message}")]
pub struct AgentError {
    pub stage: Stage,
    pub message: String,
}

impl AgentError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// One capability in the pipeline. Implementations absorb backend and parse
/// failures themselves and return their stage default; an `Err` means the
/// agent itself is broken.
#[async_trait]
pub trait StageAgent: Send + Sync {
    fn stage(&self) -> Stage;

    async fn execute(&self, input: &StageInput) -> Result<StageResult, AgentError>;
}
