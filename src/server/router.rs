use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{ask, health, ingest};
use crate::state::AppState;

/// Creates the application router.
///
/// Routes:
/// - `GET /health`
/// - `POST /ask`
/// - `POST /upload-data` (multipart `file` + `type`)
/// - `POST /import-from-url`
///
/// wrapped in CORS and request tracing layers.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state);
    Router::new()
        .route("/health", get(health::health))
        .route("/ask", post(ask::ask))
        .route("/upload-data", post(ingest::upload_data))
        .route("/import-from-url", post(ingest::import_from_url))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(state: &Arc<AppState>) -> CorsLayer {
    let config = match state.config.load_config() {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(
                "Failed to load config while building CORS layer: {}; allowing any origin",
                err
            );
            Value::Null
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin(&resolve_allowed_origins(&config)))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

/// An empty list or a `*` entry allows every origin.
fn allow_origin(origins: &[String]) -> AllowOrigin {
    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return AllowOrigin::any();
    }
    AllowOrigin::list(
        origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok()),
    )
}

fn resolve_allowed_origins(config: &Value) -> Vec<String> {
    config
        .get("server")
        .and_then(|server| server.get("cors_allowed_origins"))
        .and_then(|value| value.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|item| item.as_str())
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| item.to_string())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn configured_origins_are_trimmed() {
        let config = json!({
            "server": { "cors_allowed_origins": [" app://overlay ", ""] }
        });
        assert_eq!(resolve_allowed_origins(&config), vec!["app://overlay".to_string()]);
    }

    #[test]
    fn empty_or_missing_origins_resolve_to_nothing() {
        let config = json!({ "server": { "cors_allowed_origins": [] } });
        assert!(resolve_allowed_origins(&config).is_empty());
        assert!(resolve_allowed_origins(&Value::Null).is_empty());
    }
}
