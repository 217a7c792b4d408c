//! Integration tests against an in-process stub of the conversation backend.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use promptline::api::{ApiError, BackendClient, Conversation};
use promptline::ui::ChatPanel;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct StubState {
    conversations: Arc<Mutex<Vec<Conversation>>>,
}

async fn ask_ai(State(state): State<StubState>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let prompt = body
        .get("prompt")
        .and_then(|p| p.as_str())
        .unwrap_or_default()
        .to_string();

    match prompt.as_str() {
        "fail" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "boom"})),
        ),
        "plain-fail" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!("not an object with detail")),
        ),
        _ => {
            let response = format!("echo: {}", prompt);
            state.conversations.lock().unwrap().push(Conversation {
                id: format!("c-{}", prompt),
                prompt,
                response: response.clone(),
                timestamp: "2024-05-01T09:30:00".to_string(),
            });
            (StatusCode::OK, Json(json!({"response": response})))
        }
    }
}

async fn list_conversations(State(state): State<StubState>) -> Json<Vec<Conversation>> {
    Json(state.conversations.lock().unwrap().clone())
}

async fn clear_conversations(State(state): State<StubState>) -> Json<Value> {
    let mut conversations = state.conversations.lock().unwrap();
    let count = conversations.len();
    conversations.clear();
    Json(json!({"message": format!("Successfully cleared {} conversations", count)}))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "database": "stub"}))
}

/// Bind a stub backend on an ephemeral port and return its base URL.
async fn spawn_stub() -> String {
    let state = StubState::default();
    let app = Router::new()
        .route("/api/ask-ai", post(ask_ai))
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversations", delete(clear_conversations))
        .route("/health", get(health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub backend");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve stub backend");
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn ask_returns_response_and_stores_conversation() {
    let base = spawn_stub().await;
    let client = BackendClient::new(base);

    let response = client.ask("hello").await.unwrap();
    assert_eq!(response, "echo: hello");

    let conversations = client.list_conversations().await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].prompt, "hello");
    assert_eq!(conversations[0].response, "echo: hello");
}

#[tokio::test]
async fn ask_error_surfaces_structured_detail() {
    let base = spawn_stub().await;
    let client = BackendClient::new(base);

    let err = client.ask("fail").await.unwrap_err();
    assert!(matches!(err, ApiError::Backend(_)));
    assert_eq!(err.to_string(), "boom");
}

#[tokio::test]
async fn ask_error_without_detail_falls_back_to_status() {
    let base = spawn_stub().await;
    let client = BackendClient::new(base);

    let err = client.ask("plain-fail").await.unwrap_err();
    assert!(matches!(err, ApiError::Status(_)));
    assert_eq!(err.to_string(), "server error: 500");
}

#[tokio::test]
async fn network_failure_maps_to_transport_error() {
    // Nothing listens here.
    let client = BackendClient::new("http://127.0.0.1:1");

    let err = client.ask("hello").await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert!(err.to_string().starts_with("request failed"));
}

#[tokio::test]
async fn clear_conversations_empties_the_collection() {
    let base = spawn_stub().await;
    let client = BackendClient::new(base);

    client.ask("one").await.unwrap();
    client.ask("two").await.unwrap();
    assert_eq!(client.list_conversations().await.unwrap().len(), 2);

    client.clear_conversations().await.unwrap();
    assert!(client.list_conversations().await.unwrap().is_empty());
}

#[tokio::test]
async fn health_reports_backend_status() {
    let base = spawn_stub().await;
    let client = BackendClient::new(base);

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.database.as_deref(), Some("stub"));
}

#[tokio::test]
async fn local_chat_clear_never_reaches_the_backend() {
    let base = spawn_stub().await;
    let client = BackendClient::new(base);
    let mut chat = ChatPanel::new();

    let prompt = chat.submit("remember me").unwrap();
    let result = client.ask(&prompt).await;
    chat.on_response(result);
    assert_eq!(chat.messages().len(), 2);

    chat.clear();
    assert!(chat.messages().is_empty());

    // Server-side history is untouched by the local view reset.
    let conversations = client.list_conversations().await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].prompt, "remember me");
}
