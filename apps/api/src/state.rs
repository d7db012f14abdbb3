use std::sync::Arc;

use crate::agents::{build_stage_agents, CandidateAdvisor, DocumentExtractor};
use crate::config::{Config, LlmConfig};
use crate::llm_client::{GeneratorFactory, TextGenerator};
use crate::pipeline::{BatchCoordinator, PipelineOrchestrator};
use crate::store::CandidateStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CandidateStore>,
    pub documents: Arc<dyn DocumentExtractor>,
    /// Builds the backend client for each request. `LlmClient` in production.
    pub llm: Arc<dyn GeneratorFactory>,
    pub config: Config,
}

/// Everything one request needs to run résumés through the pipeline.
pub struct PipelineSession {
    pub llm_config: LlmConfig,
    pub orchestrator: Arc<PipelineOrchestrator>,
    generator: Arc<dyn TextGenerator>,
}

impl PipelineSession {
    pub fn advisor(&self) -> CandidateAdvisor {
        CandidateAdvisor::new(self.generator.clone())
    }
}

impl AppState {
    /// Agents wired to the request's backend: the default one, or Nebius when
    /// the caller supplied a key.
    pub fn session(&self, nebius_key: Option<&str>) -> PipelineSession {
        let llm_config = self.config.llm_for_request(nebius_key);
        let generator = self.llm.generator(llm_config.clone());
        let agents = build_stage_agents(
            generator.clone(),
            self.store.clone(),
            self.documents.clone(),
        );
        PipelineSession {
            llm_config,
            orchestrator: Arc::new(PipelineOrchestrator::new(agents)),
            generator,
        }
    }

    pub fn batch(&self, session: &PipelineSession) -> BatchCoordinator {
        BatchCoordinator::new(
            session.orchestrator.clone(),
            self.store.clone(),
            self.config.pipeline_timeout,
        )
    }
}
