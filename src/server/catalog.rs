use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::guidance::types::{GuidanceRequest, GuidanceResult, Priority};
use crate::llm::ConnectivityReport;
use crate::sources::types::{ConnectionStatus, KnowledgeSource, NewSource};
use crate::state::AppState;

use super::error::{ApiError, ApiJson};

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ConnectionStatus,
}

/// Guidance request as posted by the UI; sources are referenced by catalog ID.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceQuery {
    pub ticket_id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub customer_voice: String,
    #[serde(default)]
    pub agent_context: String,
    pub priority: Priority,
    #[serde(default)]
    pub source_ids: Vec<String>,
}

/// GET /api/repositories
pub async fn list(State(state): State<AppState>) -> Json<Vec<KnowledgeSource>> {
    Json(state.catalog.list().await)
}

/// POST /api/repositories
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewSource>,
) -> Result<(StatusCode, Json<KnowledgeSource>), ApiError> {
    let source = state.catalog.add(body).await?;
    Ok((StatusCode::CREATED, Json(source)))
}

/// PUT /api/repositories/:id/status
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> Result<Json<KnowledgeSource>, ApiError> {
    Ok(Json(state.catalog.set_status(&id, body.status).await?))
}

/// POST /api/guidance. Any well-formed query gets 200 with a complete result.
pub async fn guidance(
    State(state): State<AppState>,
    ApiJson(query): ApiJson<GuidanceQuery>,
) -> Json<GuidanceResult> {
    let sources = state.catalog.resolve(&query.source_ids).await;
    let request = GuidanceRequest {
        ticket_id: query.ticket_id,
        customer_id: query.customer_id.filter(|c| !c.trim().is_empty()),
        customer_voice: query.customer_voice,
        agent_context: query.agent_context,
        priority: query.priority,
        sources,
    };
    Json(state.orchestrator.produce_guidance(&request).await)
}

/// GET /api/guidance/test. Probes the endpoint guidance calls actually go to,
/// which is the proxy when one is configured.
pub async fn guidance_test(State(state): State<AppState>) -> Json<ConnectivityReport> {
    Json(state.orchestrator.test_connectivity().await)
}
