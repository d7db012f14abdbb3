use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::agents::prompts::{ADVISOR_PROMPT_TEMPLATE, ADVISOR_ROLE};
use crate::agents::{carries_fields, conform_map, structured_call};
use crate::llm_client::prompts::with_json_only;
use crate::llm_client::TextGenerator;
use crate::pipeline::stage::into_object;

/// Career advice for the candidate-facing endpoint. Runs after the pipeline
/// on the analysis section and is not part of the stage order.
pub struct CandidateAdvisor {
    llm: Arc<dyn TextGenerator>,
}

impl CandidateAdvisor {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    /// Never fails; backend or parse problems yield `fallback_advice()`.
    pub async fn advise(&self, profile: &Value) -> Value {
        let profile = match serde_json::to_string_pretty(profile) {
            Ok(p) => p,
            Err(e) => {
                warn!("Advisor could not serialize profile: {e}");
                return fallback_advice();
            }
        };
        let prompt = ADVISOR_PROMPT_TEMPLATE.replace("{profile}", &profile);

        match structured_call(
            self.llm.as_ref(),
            "Advisor",
            &with_json_only(ADVISOR_ROLE),
            &prompt,
        )
        .await
        {
            Ok(Value::Object(parsed)) if carries_fields(&advice_shape(), &parsed) => {
                Value::Object(conform_map(&advice_shape(), &parsed))
            }
            Ok(_) | Err(_) => fallback_advice(),
        }
    }
}

fn advice_shape() -> Map<String, Value> {
    into_object(json!({
        "strengths": [],
        "improvement_areas": [],
        "actionable_tips": [],
        "career_advice": ""
    }))
}

pub fn fallback_advice() -> Value {
    json!({
        "strengths": [],
        "improvement_areas": [],
        "actionable_tips": ["Update your resume with more keywords."],
        "career_advice": "Keep applying!"
    })
}
