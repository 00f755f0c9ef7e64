use axum::routing::{get, post, put};
use axum::Router;
use tracing_subscriber::EnvFilter;

use betty_rag::api;
use betty_rag::config::Config;
use betty_rag::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!("Knowledge collection: {}", config.collection);
    tracing::info!(
        "LLM provider: {} ({})",
        config.llm.provider,
        config.llm.base_url
    );
    tracing::info!(
        "Multi-pass battery: {} sub-queries, {} trigger phrases",
        config.plan.battery.len(),
        config.plan.triggers.len()
    );
    if config.use_reranking && config.reranker.base_url.is_none() {
        tracing::warn!("Reranking enabled but RERANKER_BASE_URL is unset; single-pass searches will fail");
    }

    let state = AppState::new(config.clone())?;

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/search", post(api::search::search))
        .route("/api/chat", post(api::chat::chat))
        .route("/api/config", get(api::config::get_config))
        .route("/api/config", put(api::config::update_config))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}
