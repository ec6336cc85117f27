use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body of a messages-API call, as sent to the provider or to the proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Message>,
}

impl MessagesRequest {
    /// Minimal request used to check that the endpoint and credential work.
    pub fn probe(model: &str) -> Self {
        Self {
            model: model.to_string(),
            max_tokens: 10,
            temperature: None,
            system: None,
            messages: vec![Message::user("Hello")],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

impl MessagesResponse {
    /// Text of the first content block, if that block carries text.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API key not configured")]
    MissingCredential,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Outcome of a connectivity probe. Serialized as `{success, error?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectivityReport {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Where model calls go.
#[derive(Debug, Clone)]
pub enum EndpointMode {
    /// Straight to the provider, carrying the credential.
    Direct {
        base_url: String,
        api_key: Option<String>,
    },
    /// Through a deployed instance of this service's `/api/ai/*` routes.
    Proxy { base_url: String },
}

/// Anything that can answer a messages request. The orchestrator only talks to this.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &MessagesRequest) -> Result<MessagesResponse, LlmError>;

    /// Probe the endpoint. Never fails; problems are reported in the returned value.
    async fn check(&self) -> ConnectivityReport;
}

pub struct LlmClient {
    client: reqwest::Client,
    mode: EndpointMode,
    model: String,
}

impl LlmClient {
    pub fn new(mode: EndpointMode, model: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            mode,
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_credential(&self) -> bool {
        match &self.mode {
            EndpointMode::Direct { api_key, .. } => api_key.is_some(),
            EndpointMode::Proxy { .. } => true,
        }
    }

    /// Resolve the messages endpoint from the configured base URL.
    fn endpoint(&self) -> String {
        match &self.mode {
            EndpointMode::Direct { base_url, .. } => {
                let base = base_url.trim_end_matches('/');
                if base.ends_with("/v1/messages") {
                    base.to_string()
                } else if base.ends_with("/v1") {
                    format!("{}/messages", base)
                } else {
                    format!("{}/v1/messages", base)
                }
            }
            EndpointMode::Proxy { base_url } => {
                format!("{}/api/ai/query", base_url.trim_end_matches('/'))
            }
        }
    }

    /// POST a messages-API body and return the provider's JSON untouched.
    pub async fn send<B: Serialize + ?Sized>(&self, body: &B) -> Result<serde_json::Value, LlmError> {
        let mut req = self.client.post(self.endpoint()).json(body);
        if let EndpointMode::Direct { api_key, .. } = &self.mode {
            let key = api_key.as_deref().ok_or(LlmError::MissingCredential)?;
            req = req
                .header("x-api-key", key)
                .header("anthropic-version", ANTHROPIC_VERSION);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        debug!(status = status.as_u16(), body_len = text.len(), "model response received");
        serde_json::from_str(&text).map_err(|e| LlmError::Decode(e.to_string()))
    }

    /// Connectivity probe: a 10-token "Hello" directly, or the proxy's test route.
    pub async fn probe(&self) -> ConnectivityReport {
        match &self.mode {
            EndpointMode::Direct { .. } => {
                match self.send(&MessagesRequest::probe(&self.model)).await {
                    Ok(_) => ConnectivityReport::ok(),
                    Err(e) => ConnectivityReport::failed(e.to_string()),
                }
            }
            EndpointMode::Proxy { base_url } => {
                let url = format!("{}/api/ai/test", base_url.trim_end_matches('/'));
                let resp = match self.client.get(url).send().await {
                    Ok(resp) => resp,
                    Err(e) => return ConnectivityReport::failed(e.to_string()),
                };
                if !resp.status().is_success() {
                    return ConnectivityReport::failed(format!(
                        "Backend test failed: {}",
                        resp.status().as_u16()
                    ));
                }
                resp.json::<ConnectivityReport>()
                    .await
                    .unwrap_or_else(|e| ConnectivityReport::failed(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn complete(&self, request: &MessagesRequest) -> Result<MessagesResponse, LlmError> {
        let json = self.send(request).await?;
        serde_json::from_value(json).map_err(|e| LlmError::Decode(e.to_string()))
    }

    async fn check(&self) -> ConnectivityReport {
        self.probe().await
    }
}
