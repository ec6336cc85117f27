mod config;
mod guidance;
mod llm;
mod server;
mod sources;
mod state;
#[cfg(test)]
mod testutil;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use guidance::QueryOrchestrator;
use llm::LlmClient;
use sources::SourceCatalog;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env first so RUST_LOG from .env is honored
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(ServerConfig::from_env()?);

    let provider = Arc::new(LlmClient::new(config.provider_mode(), &config.model)?);
    let guidance_client = match &config.proxy_url {
        Some(url) => {
            info!(proxy = %url, "Guidance calls routed through proxy");
            Arc::new(LlmClient::new(config.guidance_mode(), &config.model)?)
        }
        None => provider.clone(),
    };
    let orchestrator = Arc::new(QueryOrchestrator::new(guidance_client, config.model.clone()));

    let catalog = Arc::new(SourceCatalog::load(config.sources_file.as_deref()).await?);

    let state = AppState {
        config: config.clone(),
        provider,
        orchestrator,
        catalog,
    };
    let app = server::build_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, model = %config.model, "CRM guidance backend listening");
    info!(configured = config.api_key.is_some(), "Anthropic API key");
    info!(origin = %config.frontend_url, "CORS origin");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
