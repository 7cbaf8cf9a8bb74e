use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let options = state.pipeline.options();
    let documents = state.store.count(&options.documents_namespace).await.ok();
    let interactions = state.store.count(&options.interactions_namespace).await.ok();

    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "documents": documents,
        "interactions": interactions
    }))
}
