use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use overlay_rag::core::config::{AppPaths, ConfigService};
use overlay_rag::core::errors::{Service, ServiceError};
use overlay_rag::llm::{ChatRequest, LlmProvider, LlmService, LlmSettings, LlmTask};
use overlay_rag::pipeline::{Collaborators, PipelineOptions, StrategyMode, Strategy};
use overlay_rag::rag::{EmbeddingClient, InMemoryVectorStore, IngestSettings, VectorStore};
use overlay_rag::server::router::router;
use overlay_rag::state::AppState;
use overlay_rag::tools::search::{SearchResult, WebSearch};

struct CannedLlm {
    synthesis_fails: bool,
}

#[async_trait]
impl LlmProvider for CannedLlm {
    fn name(&self) -> &str {
        "canned"
    }

    async fn health_check(&self) -> Result<bool, ServiceError> {
        Ok(true)
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ServiceError> {
        match request.task {
            LlmTask::Synthesis if self.synthesis_fails => {
                Err(ServiceError::unavailable(Service::Llm, "connection refused"))
            }
            LlmTask::Synthesis => Ok("[Tip] Dodge the delayed slam.".to_string()),
            LlmTask::Scoring => Ok("9".to_string()),
            LlmTask::Expansion => Ok("- Margit tips".to_string()),
            _ => Ok("0".to_string()),
        }
    }
}

struct CharEmbedder;

#[async_trait]
impl EmbeddingClient for CharEmbedder {
    fn model(&self) -> &str {
        "char-count"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 26];
                for c in t.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                    v[(c - b'a') as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}

struct OneResultSearch;

#[async_trait]
impl WebSearch for OneResultSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchResult>, ServiceError> {
        Ok(vec![SearchResult {
            title: "Margit".to_string(),
            url: "https://example.com/margit".to_string(),
            body: "Margit is weak to bleed.".to_string(),
        }])
    }
}

struct TestApp {
    _dir: tempfile::TempDir,
    store: Arc<InMemoryVectorStore>,
    app: Router,
}

fn test_app(synthesis_fails: bool) -> TestApp {
    test_app_with_config(synthesis_fails, None)
}

fn test_app_with_config(synthesis_fails: bool, config_yaml: Option<&str>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    if let Some(yaml) = config_yaml {
        std::fs::write(dir.path().join("config.yml"), yaml).unwrap();
    }
    let paths = Arc::new(AppPaths::with_data_dir(
        dir.path().to_path_buf(),
        dir.path().to_path_buf(),
    ));
    let config = ConfigService::new(paths.clone());
    let store = Arc::new(InMemoryVectorStore::new());

    let mut settings = LlmSettings::default();
    settings.timeout = Duration::from_secs(5);
    let collaborators = Collaborators {
        llm: LlmService::new(Arc::new(CannedLlm { synthesis_fails }), settings),
        embedder: Arc::new(CharEmbedder),
        store: store.clone(),
        web: Arc::new(OneResultSearch),
    };
    let options = PipelineOptions {
        strategy: StrategyMode::Fixed(Strategy::Hybrid),
        reasoning: false,
        sufficiency_check: false,
        ..PipelineOptions::default()
    };

    let state = AppState::from_parts(paths, config, collaborators, options, IngestSettings::default());
    TestApp {
        _dir: dir,
        store,
        app: router(state),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_upload(kind: &str, file_name: &str, content: &str) -> Request<Body> {
    let boundary = "overlay-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"type\"\r\n\r\n{kind}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n{content}\r\n--{b}--\r\n",
        b = boundary,
        kind = kind,
        file_name = file_name,
        content = content,
    );
    Request::builder()
        .method("POST")
        .uri("/upload-data")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn wait_for_count(store: &InMemoryVectorStore, namespace: &str, expected: usize) -> bool {
    for _ in 0..100 {
        if store.count(namespace).await.unwrap() == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn health_reports_namespace_counts() {
    let t = test_app(false);

    let response = t
        .app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["documents"], 0);
    assert_eq!(body["interactions"], 0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn ask_returns_answer_with_score_and_strategy() {
    let t = test_app(false);

    let response = t
        .app
        .oneshot(post_json(
            "/ask",
            json!({ "text": "How do I beat Margit?", "game_name": "Elden Ring" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["response"], "[Tip] Dodge the delayed slam.");
    assert_eq!(body["confidence_score"], 9);
    assert_eq!(body["strategy"], "hybrid");
    assert!(body["elapsed_time"].as_f64().unwrap() >= 0.0);
    assert_eq!(t.store.count("game_queries").await.unwrap(), 2);
}

#[tokio::test]
async fn ask_with_blank_text_is_bad_request() {
    let t = test_app(false);

    let response = t
        .app
        .oneshot(post_json("/ask", json!({ "text": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn ask_maps_synthesis_failure_to_service_unavailable() {
    let t = test_app(true);

    let response = t
        .app
        .oneshot(post_json("/ask", json!({ "text": "Where is Ranni?" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(t.store.count("game_queries").await.unwrap(), 0);
}

#[tokio::test]
async fn upload_acknowledges_then_indexes_in_background() {
    let t = test_app(false);

    let response = t
        .app
        .oneshot(multipart_upload(
            "text",
            "margit.txt",
            "Margit the Fell Omen is weak to bleed and can be parried.",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    assert_eq!(body["chunks_count"], 1);
    assert!(body["message"].as_str().unwrap().contains("margit.txt"));
    assert!(wait_for_count(&t.store, "game_docs", 1).await);
}

#[tokio::test]
async fn upload_rejects_unsupported_type() {
    let t = test_app(false);

    let response = t
        .app
        .oneshot(multipart_upload("docx", "guide.docx", "content"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_rejects_empty_file() {
    let t = test_app(false);

    let response = t
        .app
        .oneshot(multipart_upload("markdown", "empty.md", "   "))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn import_rejects_invalid_url() {
    let t = test_app(false);

    for url in ["not a url", "ftp://example.com/file", "file:///etc/passwd"] {
        let response = t
            .app
            .clone()
            .oneshot(post_json("/import-from-url", json!({ "url": url })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "url {}", url);
    }
}

fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method("OPTIONS")
        .uri("/ask")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn cors_allows_any_origin_when_none_configured() {
    let t = test_app_with_config(false, Some("server:\n  cors_allowed_origins: []\n"));

    for origin in ["null", "tauri://localhost", "http://localhost:3000"] {
        let response = t.app.clone().oneshot(preflight(origin)).await.unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*",
            "origin {}",
            origin
        );
    }
}

#[tokio::test]
async fn cors_restricts_to_configured_origins() {
    let t = test_app_with_config(
        false,
        Some("server:\n  cors_allowed_origins:\n    - app://overlay\n"),
    );

    let allowed = t.app.clone().oneshot(preflight("app://overlay")).await.unwrap();
    assert_eq!(
        allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "app://overlay"
    );

    let denied = t.app.clone().oneshot(preflight("https://evil.example")).await.unwrap();
    assert!(denied.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
