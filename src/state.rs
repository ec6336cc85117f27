use std::sync::Arc;

use crate::config::ServerConfig;
use crate::guidance::QueryOrchestrator;
use crate::llm::LlmClient;
use crate::sources::SourceCatalog;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Direct provider client used by the `/api/ai/*` proxy routes.
    pub provider: Arc<LlmClient>,
    pub orchestrator: Arc<QueryOrchestrator>,
    pub catalog: Arc<SourceCatalog>,
}
