use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::llm::{EndpointMode, DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Process configuration, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Only origin allowed by CORS.
    pub frontend_url: String,
    /// Provider credential held server-side.
    pub api_key: Option<String>,
    pub provider_base_url: String,
    pub model: String,
    /// When set, guidance calls go through this proxy instead of the provider.
    pub proxy_url: Option<String>,
    /// JSON list used to seed the source catalog.
    pub sources_file: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("PORT") {
            Some(p) => p.parse().with_context(|| format!("Invalid PORT: {}", p))?,
            None => 3001,
        };

        Ok(Self {
            port,
            frontend_url: var("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            api_key: var("ANTHROPIC_API_KEY"),
            provider_base_url: var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: var("GUIDANCE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            proxy_url: var("GUIDANCE_PROXY_URL"),
            sources_file: var("SOURCES_FILE").map(PathBuf::from),
        })
    }

    /// Direct provider access with the server credential; used by the proxy routes.
    pub fn provider_mode(&self) -> EndpointMode {
        EndpointMode::Direct {
            base_url: self.provider_base_url.clone(),
            api_key: self.api_key.clone(),
        }
    }

    /// Endpoint the guidance orchestrator talks to.
    pub fn guidance_mode(&self) -> EndpointMode {
        match &self.proxy_url {
            Some(base_url) => EndpointMode::Proxy {
                base_url: base_url.clone(),
            },
            None => self.provider_mode(),
        }
    }
}
