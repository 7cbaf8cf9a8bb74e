use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::rag::extract::{extract_document_text, fetch_url_text, parse_import_url};
use crate::rag::DocumentKind;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadAck {
    pub message: String,
    pub chunks_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct ImportUrlRequest {
    pub url: String,
}

/// Accept a `file` plus its `type` and index it in the background.
pub async fn upload_data(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut kind_field: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                file = Some((name, bytes.to_vec()));
            }
            Some("type") => {
                kind_field = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Invalid type field: {}", e)))?,
                );
            }
            _ => {}
        }
    }

    let kind_name = kind_field.ok_or_else(|| ApiError::BadRequest("Missing 'type' field".to_string()))?;
    let kind = DocumentKind::from_upload_type(&kind_name)
        .ok_or_else(|| ApiError::BadRequest(format!("Unsupported file type: {}", kind_name)))?;
    let (file_name, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;

    let text = extract_document_text(&bytes, kind)?;
    let chunks_count = state.ingest.settings().estimate_chunks(&text);
    tracing::info!("Received {} '{}' ({} bytes)", kind, file_name, bytes.len());

    let message = format!("{} file '{}' uploaded and processing in background", kind, file_name);
    state.ingest.spawn_ingest(text, file_name, kind);

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadAck {
            message,
            chunks_count,
        }),
    ))
}

/// Fetch a page and index its text in the background.
pub async fn import_from_url(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ImportUrlRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let url = parse_import_url(&payload.url)?;
    let page = fetch_url_text(&url, state.ingest.settings().fetch_timeout).await?;
    let chunks_count = state.ingest.settings().estimate_chunks(&page.text);

    let message = format!("Content from {} imported and processing in background", url);
    state
        .ingest
        .spawn_ingest(page.text, page.source_name, DocumentKind::Url);

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadAck {
            message,
            chunks_count,
        }),
    ))
}
