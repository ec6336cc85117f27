use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::llm::LlmError;
use crate::sources::SourceError;

/// Errors surfaced to HTTP callers as `{error, details?|message?}` JSON.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Anthropic API key not configured on server")]
    MissingCredential,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Anthropic API error: {status}")]
    Upstream { status: u16 },
    #[error("Internal server error")]
    Internal(String),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Caller-facing category for a provider status code.
pub fn upstream_details(status: u16) -> &'static str {
    match status {
        401 => "Invalid API key",
        429 => "Rate limit exceeded",
        500 => "Anthropic service error",
        _ => "Unknown error",
    }
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::MissingCredential => ApiError::MissingCredential,
            LlmError::Status { status, body } => {
                error!(status, body = %body, "Anthropic API error");
                ApiError::Upstream { status }
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// `Json` extractor whose rejections use the same `{error}` body as every other failure.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            ApiError::MissingCredential => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::Upstream { status } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                json!({ "error": message, "details": upstream_details(status) }),
            ),
            ApiError::Internal(detail) => {
                error!(error = %detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": message, "message": detail }),
                )
            }
            ApiError::Source(SourceError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, json!({ "error": message }))
            }
            ApiError::Source(_) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_details() {
        assert_eq!(upstream_details(401), "Invalid API key");
        assert_eq!(upstream_details(429), "Rate limit exceeded");
        assert_eq!(upstream_details(500), "Anthropic service error");
        assert_eq!(upstream_details(404), "Unknown error");
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::MissingCredential, StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Upstream { status: 429 }, StatusCode::TOO_MANY_REQUESTS),
            (ApiError::Upstream { status: 42 }, StatusCode::BAD_GATEWAY),
            (ApiError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ApiError::Source(SourceError::NotFound("7".into())),
                StatusCode::NOT_FOUND,
            ),
            (ApiError::Source(SourceError::MissingName), StatusCode::BAD_REQUEST),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
