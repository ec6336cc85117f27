//! Pass-through routes to the model provider. The credential never leaves the server.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::guidance::{GUIDANCE_MAX_TOKENS, GUIDANCE_TEMPERATURE};
use crate::llm::ConnectivityReport;
use crate::state::AppState;

use super::error::{ApiError, ApiJson};

/// Hard ceiling on `max_tokens` forwarded to the provider.
pub const MAX_FORWARDED_TOKENS: u32 = 4000;

#[derive(Debug, Default, Deserialize)]
pub struct ProxyQuery {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub system: Option<Value>,
    #[serde(default)]
    pub messages: Option<Value>,
}

/// Body sent upstream. `system` and `messages` keep whatever shape the caller
/// used (plain strings or content-block arrays).
#[derive(Debug, Serialize)]
pub struct ForwardedRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub system: Value,
    pub messages: Vec<Value>,
}

impl ProxyQuery {
    /// Apply defaults and the token ceiling. Fails unless `messages` is a non-empty array.
    pub fn into_request(self, default_model: &str) -> Result<ForwardedRequest, ApiError> {
        let messages = match self.messages {
            Some(Value::Array(messages)) if !messages.is_empty() => messages,
            _ => return Err(ApiError::BadRequest("messages array is required".to_string())),
        };

        Ok(ForwardedRequest {
            model: self
                .model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| default_model.to_string()),
            max_tokens: self
                .max_tokens
                .filter(|n| *n > 0)
                .unwrap_or(GUIDANCE_MAX_TOKENS)
                .min(MAX_FORWARDED_TOKENS),
            temperature: self.temperature.unwrap_or(GUIDANCE_TEMPERATURE),
            system: self
                .system
                .filter(|s| !s.is_null())
                .unwrap_or_else(|| Value::String(String::new())),
            messages,
        })
    }
}

/// POST /api/ai/query
pub async fn query(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ProxyQuery>,
) -> Result<Json<Value>, ApiError> {
    if !state.provider.has_credential() {
        return Err(ApiError::MissingCredential);
    }

    let request = body.into_request(state.provider.model())?;
    info!(
        model = %request.model,
        max_tokens = request.max_tokens,
        messages = request.messages.len(),
        "Forwarding model request"
    );

    let response = state.provider.send(&request).await?;
    Ok(Json(response))
}

/// GET /api/ai/test
pub async fn test(State(state): State<AppState>) -> (StatusCode, Json<ConnectivityReport>) {
    if !state.provider.has_credential() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ConnectivityReport::failed("Anthropic API key not configured")),
        );
    }
    (StatusCode::OK, Json(state.provider.probe().await))
}
