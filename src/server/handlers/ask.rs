use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::pipeline::AnswerRequest;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub text: String,
    pub game_name: Option<String>,
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request = AnswerRequest::new(&payload.text, payload.game_name.as_deref())?;

    let response = state.pipeline.answer(request).await.map_err(|err| {
        tracing::error!("Error processing question: {}", err);
        ApiError::ServiceUnavailable(format!("Could not answer the question: {}", err))
    })?;

    Ok(Json(json!({
        "response": response.answer,
        "elapsed_time": response.elapsed.as_secs_f64(),
        "confidence_score": response.quality_score,
        "strategy": response.strategy
    })))
}
