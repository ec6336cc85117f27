mod ai;
mod catalog;
pub mod error;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::state::AppState;

pub fn build_app(state: AppState) -> Router {
    // The UI sends cookies in dev, so the origin must be explicit rather than `Any`.
    let cors = match HeaderValue::from_str(&state.config.frontend_url) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
        Err(_) => {
            warn!(origin = %state.config.frontend_url, "Invalid FRONTEND_URL, CORS disabled");
            CorsLayer::new()
        }
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/ai/query", post(ai::query))
        .route("/api/ai/test", get(ai::test))
        .route("/api/repositories", get(catalog::list).post(catalog::create))
        .route("/api/repositories/:id/status", put(catalog::set_status))
        .route("/api/guidance", post(catalog::guidance))
        .route("/api/guidance/test", get(catalog::guidance_test))
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
}
