use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::agents::prompts::{MATCHER_PROMPT_TEMPLATE, MATCHER_ROLE};
use crate::agents::{clamp_score, conform, conformed_stage_call};
use crate::llm_client::prompts::with_json_only;
use crate::llm_client::TextGenerator;
use crate::models::job::JobRow;
use crate::pipeline::stage::into_object;
use crate::pipeline::{AgentError, Stage, StageAgent, StageInput, StageResult};
use crate::store::CandidateStore;

/// Matches the analysed profile against the stored job catalog.
///
/// Catalog: `search_jobs(technical_skills, experience_level)`, or every job
/// when the search finds nothing. An empty catalog means no matches and no
/// backend call.
pub struct MatcherAgent {
    llm: Arc<dyn TextGenerator>,
    store: Arc<dyn CandidateStore>,
}

impl MatcherAgent {
    pub fn new(llm: Arc<dyn TextGenerator>, store: Arc<dyn CandidateStore>) -> Self {
        Self { llm, store }
    }

    async fn catalog(&self, skills: &[String], level: &str) -> Vec<JobRow> {
        match self.store.search_jobs(skills, level).await {
            Ok(jobs) if !jobs.is_empty() => return jobs,
            Ok(_) => {}
            Err(e) => warn!("Job search failed, trying full catalog: {e:#}"),
        }
        self.store.get_all_jobs().await.unwrap_or_else(|e| {
            warn!("Job catalog unavailable: {e:#}");
            Vec::new()
        })
    }
}

#[async_trait]
impl StageAgent for MatcherAgent {
    fn stage(&self) -> Stage {
        Stage::Matching
    }

    async fn execute(&self, input: &StageInput) -> Result<StageResult, AgentError> {
        let skills: Vec<String> = input
            .field(Stage::Analysis, "technical_skills")
            .and_then(Value::as_array)
            .map(|skills| {
                skills
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let level = input.str_field(Stage::Analysis, "experience_level");

        let jobs = self.catalog(&skills, level).await;
        if jobs.is_empty() {
            info!("No jobs in catalog; skipping matching");
            return Ok(StageResult::new(Stage::Matching.default_section()));
        }

        let jobs_json = serde_json::to_string_pretty(&jobs.iter().map(job_brief).collect::<Vec<_>>())
            .map_err(|e| AgentError::new(self.stage(), e.to_string()))?;
        let analysis = serde_json::to_string_pretty(input.section(Stage::Analysis))
            .map_err(|e| AgentError::new(self.stage(), e.to_string()))?;
        let prompt = MATCHER_PROMPT_TEMPLATE
            .replace("{analysis}", &analysis)
            .replace("{jobs}", &jobs_json);

        let result = conformed_stage_call(
            self.llm.as_ref(),
            Stage::Matching,
            &with_json_only(MATCHER_ROLE),
            &prompt,
        )
        .await;
        if result.is_fallback() {
            return Ok(result);
        }

        let matches = normalize_matches(result.get("matched_jobs"));
        let count = matches.len();
        Ok(StageResult::new(into_object(json!({
            "matched_jobs": matches,
            "number_of_matches": count
        }))))
    }
}

fn job_brief(job: &JobRow) -> Value {
    json!({
        "title": job.title,
        "company": job.company,
        "location": job.location,
        "experience_level": job.experience_level,
        "requirements": job.requirements.0,
    })
}

/// Each match becomes `{title, match_score, location}`; untitled entries are
/// dropped.
fn normalize_matches(raw: Option<&Value>) -> Vec<Value> {
    let shape = into_object(json!({"title": "", "match_score": 0, "location": ""}));
    raw.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| conform(&shape, item))
                .filter(|m| m["title"].as_str().is_some_and(|t| !t.trim().is_empty()))
                .map(|mut m: Map<String, Value>| {
                    clamp_score(&mut m, "match_score");
                    Value::Object(m)
                })
                .collect()
        })
        .unwrap_or_default()
}
