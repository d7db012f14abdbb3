use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::agents::conformed_stage_call;
use crate::agents::prompts::{ENHANCER_PROMPT_TEMPLATE, ENHANCER_ROLE};
use crate::llm_client::prompts::with_json_only;
use crate::llm_client::TextGenerator;
use crate::pipeline::{AgentError, Stage, StageAgent, StageInput, StageResult};

pub struct EnhancerAgent {
    llm: Arc<dyn TextGenerator>,
}

impl EnhancerAgent {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl StageAgent for EnhancerAgent {
    fn stage(&self) -> Stage {
        Stage::Enhancement
    }

    async fn execute(&self, input: &StageInput) -> Result<StageResult, AgentError> {
        // Sectioned data when the extractor produced it, raw text otherwise.
        let source = match input.field(Stage::Extraction, "structured_data") {
            Some(Value::Object(map)) if !map.is_empty() => serde_json::to_string_pretty(map)
                .map_err(|e| AgentError::new(self.stage(), e.to_string()))?,
            _ => input.str_field(Stage::Extraction, "raw_text").to_string(),
        };

        let prompt = ENHANCER_PROMPT_TEMPLATE.replace("{structured_data}", &source);
        Ok(conformed_stage_call(
            self.llm.as_ref(),
            Stage::Enhancement,
            &with_json_only(ENHANCER_ROLE),
            &prompt,
        )
        .await)
    }
}
