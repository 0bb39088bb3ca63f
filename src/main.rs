use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use verse_search::api;
use verse_search::config::Config;
use verse_search::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!(
        "LLM provider: {} ({})",
        config.llm.provider,
        config.llm.base_url
    );
    tracing::info!("Reranker: {}", config.reranker.base_url);

    let state = AppState::new(config.clone())?;

    let app = Router::new()
        .route("/", get(api::admin::home))
        .route("/api/search", post(api::search::search))
        .route("/api/reload", post(api::admin::reload))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
