use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use matcher_settings::api::{
    HttpBackend, PullRequest, SaveRequest, SettingsBackend, TestConfig, TestRequest,
};
use matcher_settings::error::Error;
use serde_json::{Value, json};

/// What the mock server saw.
#[derive(Default)]
struct Seen {
    saved: Option<Value>,
    tested: Option<Value>,
    pulled: Option<HashMap<String, String>>,
    model_provider: Option<String>,
}

type Shared = Arc<Mutex<Seen>>;

async fn providers() -> Json<Value> {
    Json(json!({
        "providers": [
            {"id": "gemini", "name": "Google Gemini", "description": "Hosted", "requires_api_key": true, "icon": "g.svg"},
            {"id": "ollama", "name": "Ollama", "requires_api_key": false, "requires_host": true}
        ]
    }))
}

async fn settings() -> Json<Value> {
    Json(json!({
        "provider": "ollama",
        "model_name": "llama3",
        "api_key_set": false,
        "host": "gpu-box",
        "port": 9000,
        "configured": true
    }))
}

async fn save(State(seen): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    let reject = body["model_name"] == "missing";
    seen.lock().unwrap().saved = Some(body);
    if reject {
        (StatusCode::BAD_REQUEST, "Model missing not found").into_response()
    } else {
        Json(json!({"status": "ok"})).into_response()
    }
}

async fn models(State(seen): State<Shared>, Path(provider): Path<String>) -> impl IntoResponse {
    seen.lock().unwrap().model_provider = Some(provider.clone());
    if provider == "broken" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(json!({"models": ["llama3", "mistral"]})).into_response()
}

async fn pull(
    State(seen): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    seen.lock().unwrap().pulled = Some(query);
    Json(json!({"status": "queued"}))
}

async fn test_ai(State(seen): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let connected = body["config"]["api_key"] == "sk-good";
    seen.lock().unwrap().tested = Some(body);
    if connected {
        Json(json!({"connected": true}))
    } else {
        Json(json!({"connected": false, "message": "bad key"}))
    }
}

fn routes(seen: Shared) -> Router {
    Router::new()
        .route("/ai-providers", get(providers))
        .route("/ai-settings", get(settings).post(save))
        .route("/ai-models/pull", post(pull))
        .route("/ai-models/{provider}", get(models))
        .route("/test-ai", post(test_ai))
        .with_state(seen)
}

/// Serve `router` on an ephemeral port and return its base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn backend() -> (HttpBackend, Shared) {
    let seen = Shared::default();
    let base = serve(routes(seen.clone())).await;
    (HttpBackend::new(&base, None).unwrap(), seen)
}

#[tokio::test]
async fn decodes_catalog_and_settings() {
    let (backend, _seen) = backend().await;

    let providers = backend.providers().await.unwrap();
    assert_eq!(providers.len(), 2);
    assert_eq!(providers[0].id, "gemini");
    assert!(providers[0].requires_api_key);
    assert!(!providers[0].requires_host);
    assert_eq!(providers[1].description, "");
    assert!(providers[1].requires_host);

    let current = backend.current_settings().await.unwrap();
    assert_eq!(current.provider, "ollama");
    assert_eq!(current.host.as_deref(), Some("gpu-box"));
    assert_eq!(current.port, Some(9000));
    assert!(current.configured);
    assert!(current.api_key.is_none());
}

#[tokio::test]
async fn save_posts_json_body() {
    let (backend, seen) = backend().await;
    backend
        .save_settings(&SaveRequest {
            provider: "gemini".into(),
            model_name: "gemini-1.5-pro".into(),
            api_key: String::new(),
            host: None,
            port: None,
        })
        .await
        .unwrap();

    let body = seen.lock().unwrap().saved.clone().unwrap();
    assert_eq!(
        body,
        json!({"provider": "gemini", "model_name": "gemini-1.5-pro", "api_key": ""})
    );
}

#[tokio::test]
async fn error_body_is_surfaced_verbatim() {
    let (backend, _seen) = backend().await;
    let err = backend
        .save_settings(&SaveRequest {
            provider: "gemini".into(),
            model_name: "missing".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Status { status: 400, .. }));
    assert_eq!(err.to_string(), "Model missing not found");
}

#[tokio::test]
async fn empty_error_body_shows_status() {
    let (backend, _seen) = backend().await;
    let err = backend.models("broken").await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 500");
}

#[tokio::test]
async fn model_path_is_percent_encoded() {
    let (backend, seen) = backend().await;
    let models = backend.models("my provider/x").await.unwrap();
    assert_eq!(models, ["llama3", "mistral"]);
    assert_eq!(
        seen.lock().unwrap().model_provider.as_deref(),
        Some("my provider/x")
    );
}

#[tokio::test]
async fn pull_sends_query_parameters() {
    let (backend, seen) = backend().await;
    backend
        .pull_model(&PullRequest {
            provider: "ollama".into(),
            model_name: "phi3:mini".into(),
            host: "gpu box".into(),
            port: 11434,
        })
        .await
        .unwrap();

    let query = seen.lock().unwrap().pulled.clone().unwrap();
    assert_eq!(query["provider"], "ollama");
    assert_eq!(query["model_name"], "phi3:mini");
    assert_eq!(query["host"], "gpu box");
    assert_eq!(query["port"], "11434");
}

#[tokio::test]
async fn test_connection_posts_nested_config() {
    let (backend, seen) = backend().await;
    let response = backend
        .test_connection(&TestRequest {
            provider: "gemini".into(),
            config: TestConfig {
                api_key: "sk-bad".into(),
                model: "gemini-1.5-pro".into(),
                host: None,
                port: None,
            },
        })
        .await
        .unwrap();
    assert!(!response.connected);
    assert_eq!(response.message.as_deref(), Some("bad key"));

    let body = seen.lock().unwrap().tested.clone().unwrap();
    assert_eq!(
        body,
        json!({"provider": "gemini", "config": {"api_key": "sk-bad", "model": "gemini-1.5-pro"}})
    );
}

#[tokio::test]
async fn backend_under_a_prefix() {
    let seen = Shared::default();
    let base = serve(Router::new().nest("/api", routes(seen))).await;
    let backend = HttpBackend::new(&format!("{base}/api"), None).unwrap();
    assert_eq!(backend.providers().await.unwrap().len(), 2);
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(&format!("http://{addr}"), None).unwrap();
    assert!(matches!(backend.providers().await, Err(Error::Http(_))));
}
