use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::agents::document::DocumentExtractor;
use crate::agents::prompts::{EXTRACTOR_PROMPT_TEMPLATE, EXTRACTOR_ROLE};
use crate::agents::structured_call;
use crate::llm_client::prompts::with_json_only;
use crate::llm_client::TextGenerator;
use crate::pipeline::stage::into_object;
use crate::pipeline::{AgentError, Stage, StageAgent, StageInput, StageResult};

/// Reads the document and asks the backend to section it.
///
/// No text → the default with `extraction_status = "failed"`, which the
/// orchestrator treats as the hard-failure exit. Text but an unusable
/// structuring reply → raw text kept, `structured_data = {}`, degraded.
pub struct ExtractorAgent {
    llm: Arc<dyn TextGenerator>,
    documents: Arc<dyn DocumentExtractor>,
}

impl ExtractorAgent {
    pub fn new(llm: Arc<dyn TextGenerator>, documents: Arc<dyn DocumentExtractor>) -> Self {
        Self { llm, documents }
    }
}

#[async_trait]
impl StageAgent for ExtractorAgent {
    fn stage(&self) -> Stage {
        Stage::Extraction
    }

    async fn execute(&self, input: &StageInput) -> Result<StageResult, AgentError> {
        let path = &input.input.path;
        let text = match self.documents.extract_text(path).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("No text found in {}", input.input.filename);
                return Ok(StageResult::fallback(
                    Stage::Extraction,
                    "document contains no text",
                ));
            }
            Err(e) => {
                warn!("Could not read {}: {e}", input.input.filename);
                return Ok(StageResult::fallback(
                    Stage::Extraction,
                    format!("document unreadable: {e}"),
                ));
            }
        };
        info!(
            "Extracted {} characters from {}",
            text.len(),
            input.input.filename
        );

        let prompt = EXTRACTOR_PROMPT_TEMPLATE.replace("{resume_text}", &text);
        let structured = structured_call(
            self.llm.as_ref(),
            Stage::Extraction.name(),
            &with_json_only(EXTRACTOR_ROLE),
            &prompt,
        )
        .await;

        let (structured_data, degraded) = match structured {
            Ok(Value::Object(map)) if !map.is_empty() && !map.contains_key("error") => (map, None),
            Ok(Value::Object(_)) => (Map::new(), Some("reply carried no stage fields".to_string())),
            Ok(_) => (Map::new(), Some("structured reply was not a JSON object".to_string())),
            Err(reason) => (Map::new(), Some(reason)),
        };

        let result = StageResult::new(into_object(json!({
            "raw_text": text,
            "structured_data": structured_data,
            "extraction_status": "completed"
        })));
        Ok(match degraded {
            Some(reason) => result.degraded(reason),
            None => result,
        })
    }
}
