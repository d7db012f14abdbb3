use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::conformed_stage_call;
use crate::agents::prompts::{ANALYZER_PROMPT_TEMPLATE, ANALYZER_ROLE};
use crate::llm_client::prompts::with_json_only;
use crate::llm_client::TextGenerator;
use crate::pipeline::{AgentError, Stage, StageAgent, StageInput, StageResult};

pub struct AnalyzerAgent {
    llm: Arc<dyn TextGenerator>,
}

impl AnalyzerAgent {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl StageAgent for AnalyzerAgent {
    fn stage(&self) -> Stage {
        Stage::Analysis
    }

    async fn execute(&self, input: &StageInput) -> Result<StageResult, AgentError> {
        let profile = input
            .sections_json()
            .map_err(|e| AgentError::new(self.stage(), e.to_string()))?;
        let prompt = ANALYZER_PROMPT_TEMPLATE.replace("{profile}", &profile);

        Ok(conformed_stage_call(
            self.llm.as_ref(),
            Stage::Analysis,
            &with_json_only(ANALYZER_ROLE),
            &prompt,
        )
        .await)
    }
}
