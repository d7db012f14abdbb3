use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::agents::prompts::{SCREENER_PROMPT_TEMPLATE, SCREENER_ROLE};
use crate::agents::{clamp_score, conformed_stage_call};
use crate::llm_client::prompts::with_json_only;
use crate::llm_client::TextGenerator;
use crate::pipeline::{AgentError, Stage, StageAgent, StageInput, StageResult};

pub struct ScreenerAgent {
    llm: Arc<dyn TextGenerator>,
}

impl ScreenerAgent {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl StageAgent for ScreenerAgent {
    fn stage(&self) -> Stage {
        Stage::Screening
    }

    async fn execute(&self, input: &StageInput) -> Result<StageResult, AgentError> {
        let context = input
            .sections_json()
            .map_err(|e| AgentError::new(self.stage(), e.to_string()))?;
        let prompt = SCREENER_PROMPT_TEMPLATE.replace("{context}", &context);

        let result = conformed_stage_call(
            self.llm.as_ref(),
            Stage::Screening,
            &with_json_only(SCREENER_ROLE),
            &prompt,
        )
        .await;
        if result.is_fallback() {
            return Ok(result);
        }

        // A real screening happened; "Pending Review" is reserved for fallbacks.
        let mut data = result.data().clone();
        clamp_score(&mut data, "screening_score");
        data.insert(
            "screening_status".to_string(),
            Value::String("Screened".to_string()),
        );
        Ok(StageResult::new(data))
    }
}
