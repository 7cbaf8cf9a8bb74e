use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use overlay_rag::core::config::{get_str, get_u64};
use overlay_rag::server;
use overlay_rag::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize().await?;
    overlay_rag::core::logging::init(&state.paths);

    let config = state.config.load_config()?;
    if !state.llm.health_check().await {
        tracing::warn!(
            "LLM provider '{}' is not reachable; answers will fail until it is",
            state.llm.provider_name()
        );
    }

    let host = get_str(&config, "server.host").unwrap_or("127.0.0.1").to_string();
    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .or_else(|| get_u64(&config, "server.port").map(|p| p as u16))
        .unwrap_or(8000);
    let bind_addr = format!("{}:{}", host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state.clone());

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
