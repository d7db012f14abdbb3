//! Test doubles shared across module tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::types::Json;

use crate::agents::document::{DocumentExtractor, ExtractionError};
use crate::config::{
    Config, LlmConfig, LlmProvider, DEFAULT_NEBIUS_BASE_URL, DEFAULT_NEBIUS_MODEL,
    DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL,
};
use crate::llm_client::{GeneratorFactory, LlmError, TextGenerator};
use crate::models::candidate::{CandidateRow, CandidateSummary};
use crate::models::job::{JobRow, NewJob};
use crate::pipeline::context::{ContextError, WorkflowContext, WorkflowReport};
use crate::pipeline::orchestrator::ResumePipeline;
use crate::pipeline::stage::into_object;
use crate::pipeline::{
    AgentError, PipelineError, ResumeInput, Stage, StageAgent, StageAgents, StageInput,
    StageResult,
};
use crate::store::{normalize_filename, CandidateStore};

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/recruiter".to_string(),
        port: 8000,
        rust_log: "info".to_string(),
        llm: LlmConfig {
            provider: LlmProvider::Ollama,
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
        },
        nebius_base_url: DEFAULT_NEBIUS_BASE_URL.to_string(),
        nebius_model: DEFAULT_NEBIUS_MODEL.to_string(),
        resume_dir: "resumes".to_string(),
        pipeline_timeout: Duration::from_secs(600),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Text generation
// ────────────────────────────────────────────────────────────────────────────

enum Script {
    Always(String),
    Sequence(Mutex<VecDeque<String>>),
    Failing(String),
}

/// Deterministic `TextGenerator`. Records every prompt it receives.
pub struct ScriptedGenerator {
    script: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self::with_script(Script::Always(reply.to_string()))
    }

    /// Replies in order; once exhausted every call fails.
    pub fn sequence(replies: &[&str]) -> Self {
        Self::with_script(Script::Sequence(Mutex::new(
            replies.iter().map(|r| r.to_string()).collect(),
        )))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_script(Script::Failing(message.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _system: &str, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let unavailable = |message: &str| LlmError::Api {
            status: 503,
            message: message.to_string(),
        };
        match &self.script {
            Script::Always(reply) => Ok(reply.clone()),
            Script::Sequence(replies) => replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| unavailable("script exhausted")),
            Script::Failing(message) => Err(unavailable(message)),
        }
    }
}

/// Hands out the same scripted generator whatever backend is requested, and
/// remembers the selections.
pub struct ScriptedFactory {
    pub generator: Arc<ScriptedGenerator>,
    pub selections: Mutex<Vec<LlmConfig>>,
}

impl ScriptedFactory {
    pub fn new(generator: ScriptedGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
            selections: Mutex::new(Vec::new()),
        }
    }

    pub fn last_provider(&self) -> Option<LlmProvider> {
        self.selections.lock().unwrap().last().map(|c| c.provider)
    }
}

impl GeneratorFactory for ScriptedFactory {
    fn generator(&self, config: LlmConfig) -> Arc<dyn TextGenerator> {
        self.selections.lock().unwrap().push(config);
        self.generator.clone()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Documents
// ────────────────────────────────────────────────────────────────────────────

pub enum StubDocuments {
    Text(String),
    Failing(String),
}

impl StubDocuments {
    pub fn text(text: &str) -> Self {
        StubDocuments::Text(text.to_string())
    }

    pub fn failing(message: &str) -> Self {
        StubDocuments::Failing(message.to_string())
    }
}

#[async_trait]
impl DocumentExtractor for StubDocuments {
    async fn extract_text(&self, _path: &Path) -> Result<String, ExtractionError> {
        match self {
            StubDocuments::Text(text) => Ok(text.clone()),
            StubDocuments::Failing(message) => Err(ExtractionError::Pdf(message.clone())),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Persistence
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryTables {
    candidates: Vec<CandidateRow>,
    jobs: Vec<JobRow>,
    failing_inserts: HashSet<String>,
}

/// In-memory `CandidateStore`. Ids start at 1 per table.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
    full_scans: AtomicUsize,
}

impl MemoryStore {
    pub fn with_sample_jobs() -> Self {
        let store = Self::default();
        {
            let mut tables = store.tables.lock().unwrap();
            for (title, location, level, requirements) in [
                ("Senior Software Engineer", "Remote", "Senior", vec!["Python", "Cloud", "5+ years experience"]),
                ("Data Engineer", "Remote", "Mid-level", vec!["Python", "Spark", "SQL"]),
                ("Data Scientist", "Cairo", "Senior", vec!["Python", "ML", "Statistics"]),
                ("Frontend Developer", "Berlin", "Mid-level", vec!["TypeScript", "React"]),
            ] {
                let id = tables.jobs.len() as i64 + 1;
                tables.jobs.push(job_row(id, title, location, level, requirements));
            }
        }
        store
    }

    /// Every `add_candidate` for this filename will fail.
    pub fn fail_inserts_for(&self, filename: &str) {
        self.tables
            .lock()
            .unwrap()
            .failing_inserts
            .insert(filename.to_string());
    }

    /// How many times `get_all_candidates` ran.
    pub fn full_scans(&self) -> usize {
        self.full_scans.load(Ordering::SeqCst)
    }

    /// Stored filenames in insertion order.
    pub fn candidate_filenames(&self) -> Vec<String> {
        self.tables
            .lock()
            .unwrap()
            .candidates
            .iter()
            .map(|c| c.filename.clone())
            .collect()
    }
}

fn job_row(id: i64, title: &str, location: &str, level: &str, requirements: Vec<&str>) -> JobRow {
    JobRow {
        id,
        title: title.to_string(),
        company: "Acme".to_string(),
        location: location.to_string(),
        job_type: "Full-time".to_string(),
        experience_level: level.to_string(),
        salary_range: None,
        description: format!("{title} at Acme"),
        requirements: Json(requirements.into_iter().map(String::from).collect()),
        benefits: Json(Vec::new()),
        created_at: Utc::now(),
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn add_candidate(&self, summary: &CandidateSummary) -> Result<i64> {
        let mut tables = self.tables.lock().unwrap();
        if tables.failing_inserts.contains(&summary.filename) {
            bail!("insert rejected for {}", summary.filename);
        }
        let id = tables.candidates.len() as i64 + 1;
        tables.candidates.push(CandidateRow {
            id,
            filename: summary.filename.clone(),
            name: Some(summary.name.clone()),
            email: summary.email.clone(),
            phone: summary.phone.clone(),
            score: summary.score,
            recommendation: Some(summary.recommendation.clone()),
            full_report: summary.full_report.clone(),
            status: summary.status.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn get_all_candidates(&self) -> Result<Vec<CandidateRow>> {
        self.full_scans.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().unwrap();
        Ok(tables.candidates.iter().rev().cloned().collect())
    }

    async fn filename_exists(&self, filename: &str) -> Result<bool> {
        let wanted = normalize_filename(filename);
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .candidates
            .iter()
            .any(|c| normalize_filename(&c.filename) == wanted))
    }

    async fn add_job(&self, job: &NewJob) -> Result<i64> {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.jobs.len() as i64 + 1;
        let mut row = job_row(
            id,
            &job.title,
            &job.location,
            &job.experience_level,
            job.requirements.iter().map(String::as_str).collect(),
        );
        row.company = job.company.clone();
        row.job_type = job.job_type.clone();
        row.salary_range = job.salary_range.clone();
        row.description = job.description.clone();
        row.benefits = Json(job.benefits.clone());
        tables.jobs.push(row);
        Ok(id)
    }

    async fn get_all_jobs(&self) -> Result<Vec<JobRow>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.jobs.iter().rev().cloned().collect())
    }

    async fn search_jobs(&self, skills: &[String], experience_level: &str) -> Result<Vec<JobRow>> {
        let skills: Vec<String> = skills
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .jobs
            .iter()
            .rev()
            .filter(|job| job.experience_level == experience_level)
            .filter(|job| {
                let requirements = job.requirements.0.join(" ").to_lowercase();
                skills.is_empty() || skills.iter().any(|s| requirements.contains(s))
            })
            .cloned()
            .collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stage agents and pipelines
// ────────────────────────────────────────────────────────────────────────────

/// Records which stages were invoked, shared by the agents of `stub_agents`.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<HashMap<Stage, usize>>>);

impl CallLog {
    fn record(&self, stage: Stage) {
        *self.0.lock().unwrap().entry(stage).or_default() += 1;
    }

    pub fn count(&self, stage: Stage) -> usize {
        self.0.lock().unwrap().get(&stage).copied().unwrap_or(0)
    }
}

enum StubBehavior {
    Return(Value),
    Degrade(String),
    Fail(String),
}

pub struct StubAgent {
    stage: Stage,
    behavior: StubBehavior,
    calls: AtomicUsize,
    log: Option<CallLog>,
}

impl StubAgent {
    fn with_behavior(stage: Stage, behavior: StubBehavior) -> Self {
        Self {
            stage,
            behavior,
            calls: AtomicUsize::new(0),
            log: None,
        }
    }

    pub fn returning(stage: Stage, data: Value) -> Self {
        Self::with_behavior(stage, StubBehavior::Return(data))
    }

    /// Returns the stage default tagged as a fallback.
    pub fn degrading(stage: Stage, reason: &str) -> Self {
        Self::with_behavior(stage, StubBehavior::Degrade(reason.to_string()))
    }

    /// Breaks the no-throw contract.
    pub fn failing(stage: Stage, message: &str) -> Self {
        Self::with_behavior(stage, StubBehavior::Fail(message.to_string()))
    }

    fn logged(mut self, log: &CallLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StageAgent for StubAgent {
    fn stage(&self) -> Stage {
        self.stage
    }

    async fn execute(&self, _input: &StageInput) -> Result<StageResult, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.record(self.stage);
        }
        match &self.behavior {
            StubBehavior::Return(data) => Ok(StageResult::new(into_object(data.clone()))),
            StubBehavior::Degrade(reason) => Ok(StageResult::fallback(self.stage, reason.clone())),
            StubBehavior::Fail(message) => Err(AgentError::new(self.stage, message.clone())),
        }
    }
}

fn stub_payload(stage: Stage) -> Value {
    let mut payload = match stage {
        Stage::Extraction => json!({
            "raw_text": "Jane Doe\njane@example.com\nRust, PostgreSQL, Kubernetes",
            "structured_data": {
                "Personal Info": {"Name": "Jane Doe", "Email": "jane@example.com", "Phone": "555-0100"},
                "Skills": ["Rust", "PostgreSQL", "Kubernetes"]
            },
            "extraction_status": "completed"
        }),
        Stage::Enhancement => json!({
            "enhanced_summary": "Systems engineer with six years of Rust.",
            "standardized_skills": ["Rust", "PostgreSQL", "Kubernetes"],
            "total_years_exp": 6
        }),
        Stage::Analysis => json!({
            "technical_skills": ["Rust", "PostgreSQL"],
            "years_of_experience": 6,
            "education": {"level": "Bachelors", "field": "Computer Science"},
            "experience_level": "Senior",
            "key_achievements": ["Cut p99 latency by 40%"],
            "domain_expertise": ["Payments"]
        }),
        Stage::Matching => json!({
            "matched_jobs": [{"title": "Senior Software Engineer", "match_score": 88, "location": "Remote"}],
            "number_of_matches": 1
        }),
        Stage::Screening => json!({
            "screening_report": "Strong backend profile.",
            "screening_score": 82,
            "red_flags": [],
            "screening_status": "Screened"
        }),
        Stage::Recommendation => json!({
            "recommendation": "Hire",
            "final_recommendation": "Hire: strong systems background",
            "next_steps": ["Schedule final interview"],
            "confidence_level": "high"
        }),
    };
    payload["produced_by"] = json!(stage.name());
    payload
}

/// Six well-behaved stub agents sharing one call log.
pub fn stub_agents() -> (StageAgents, CallLog) {
    let log = CallLog::default();
    let agent = |stage: Stage| -> Arc<dyn StageAgent> {
        Arc::new(StubAgent::returning(stage, stub_payload(stage)).logged(&log))
    };
    let agents = StageAgents {
        extractor: agent(Stage::Extraction),
        enhancer: agent(Stage::Enhancement),
        analyzer: agent(Stage::Analysis),
        matcher: agent(Stage::Matching),
        screener: agent(Stage::Screening),
        recommender: agent(Stage::Recommendation),
    };
    (agents, log)
}

/// `ResumePipeline` that skips the stages entirely.
#[derive(Default)]
pub struct StubPipeline {
    failing: Option<String>,
    hanging: Option<String>,
    panicking: Option<String>,
    calls: AtomicUsize,
}

impl StubPipeline {
    pub fn failing_on(filename: &str) -> Self {
        Self {
            failing: Some(filename.to_string()),
            ..Self::default()
        }
    }

    /// Never finishes for this filename.
    pub fn hanging_on(filename: &str) -> Self {
        Self {
            hanging: Some(filename.to_string()),
            ..Self::default()
        }
    }

    pub fn panicking_on(filename: &str) -> Self {
        Self {
            panicking: Some(filename.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResumePipeline for StubPipeline {
    async fn process(&self, input: &ResumeInput) -> Result<WorkflowReport, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.as_deref() == Some(input.filename.as_str()) {
            return Err(ContextError::MissingSection(Stage::Extraction).into());
        }
        if self.panicking.as_deref() == Some(input.filename.as_str()) {
            panic!("agent returned a malformed section");
        }
        if self.hanging.as_deref() == Some(input.filename.as_str()) {
            std::future::pending::<()>().await;
        }
        Ok(WorkflowContext::new(input.clone()).finish())
    }
}
