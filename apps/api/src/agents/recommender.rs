use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::agents::conformed_stage_call;
use crate::agents::prompts::{RECOMMENDER_PROMPT_TEMPLATE, RECOMMENDER_ROLE};
use crate::llm_client::prompts::with_json_only;
use crate::llm_client::TextGenerator;
use crate::pipeline::{AgentError, Stage, StageAgent, StageInput, StageResult};

const CONFIDENCE_LEVELS: &[&str] = &["low", "medium", "high"];

/// Produces the bottom line. `final_recommendation` is copied to the top of
/// the report; `recommendation` is the short verdict kept on the candidate.
pub struct RecommenderAgent {
    llm: Arc<dyn TextGenerator>,
}

impl RecommenderAgent {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl StageAgent for RecommenderAgent {
    fn stage(&self) -> Stage {
        Stage::Recommendation
    }

    async fn execute(&self, input: &StageInput) -> Result<StageResult, AgentError> {
        let context = input
            .sections_json()
            .map_err(|e| AgentError::new(self.stage(), e.to_string()))?;
        let prompt = RECOMMENDER_PROMPT_TEMPLATE.replace("{context}", &context);

        let result = conformed_stage_call(
            self.llm.as_ref(),
            Stage::Recommendation,
            &with_json_only(RECOMMENDER_ROLE),
            &prompt,
        )
        .await;
        if result.is_fallback() {
            return Ok(result);
        }

        let mut data = result.data().clone();
        let confidence = data
            .get("confidence_level")
            .and_then(Value::as_str)
            .map(|c| c.trim().to_ascii_lowercase())
            .filter(|c| CONFIDENCE_LEVELS.contains(&c.as_str()))
            .unwrap_or_else(|| "low".to_string());
        data.insert("confidence_level".to_string(), Value::String(confidence));
        Ok(StageResult::new(data))
    }
}
