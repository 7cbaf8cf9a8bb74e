use std::fmt;
use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// HTTP-facing error returned by handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

/// External collaborator that a [`ServiceError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Embedding,
    Llm,
    VectorStore,
    WebSearch,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Embedding => "embedding",
            Service::Llm => "llm",
            Service::VectorStore => "vector_store",
            Service::WebSearch => "web_search",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a collaborator call made by the answer pipeline or ingestion.
///
/// Only a failed synthesis call surfaces to the caller; every other
/// occurrence is logged and replaced by a fallback value.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} unavailable: {message}")]
    Unavailable { service: Service, message: String },
    #[error("{service} timed out after {after:?}")]
    Timeout { service: Service, after: Duration },
    #[error("{service} returned malformed output: {raw}")]
    MalformedOutput { service: Service, raw: String },
    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl ServiceError {
    pub fn unavailable<E: std::fmt::Display>(service: Service, err: E) -> Self {
        ServiceError::Unavailable {
            service,
            message: err.to_string(),
        }
    }

    pub fn malformed(service: Service, raw: impl Into<String>) -> Self {
        ServiceError::MalformedOutput {
            service,
            raw: raw.into(),
        }
    }

    /// True for transport, auth and timeout failures.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ServiceError::Unavailable { .. } | ServiceError::Timeout { .. }
        )
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        if err.is_unavailable() {
            ApiError::ServiceUnavailable(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

/// Run a collaborator future under a deadline, mapping expiry to
/// [`ServiceError::Timeout`].
pub async fn call_with_timeout<T, F>(
    service: Service,
    after: Duration,
    fut: F,
) -> Result<T, ServiceError>
where
    F: std::future::Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout { service, after }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_maps_to_503() {
        let err: ApiError = ServiceError::unavailable(Service::Llm, "connection refused").into();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn malformed_output_is_internal() {
        let err: ApiError = ServiceError::malformed(Service::Embedding, "[]").into();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[tokio::test]
    async fn timeout_is_reported_as_service_error() {
        let result: Result<(), ServiceError> =
            call_with_timeout(Service::WebSearch, Duration::from_millis(10), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        match result {
            Err(ServiceError::Timeout { service, .. }) => assert_eq!(service, Service::WebSearch),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
