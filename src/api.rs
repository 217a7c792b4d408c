use chrono::{DateTime, NaiveDateTime};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

/// Maximum prompt length accepted by the backend.
pub const MAX_PROMPT_LEN: usize = 10_000;

/// Errors surfaced by backend calls. Every variant renders to the single
/// user-facing string the UI displays; none are fatal to the application.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-success status whose body carried a structured `detail` field.
    #[error("{0}")]
    Backend(String),

    /// Non-success status with no usable error body.
    #[error("server error: {}", .0.as_u16())]
    Status(StatusCode),

    /// Transport failure or response decode failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Request body for `POST /api/ask-ai`.
#[derive(Debug, Serialize)]
pub struct PromptRequest {
    pub prompt: String,
}

/// Success body for `POST /api/ask-ai`.
#[derive(Debug, Deserialize)]
pub struct PromptResponse {
    pub response: String,
}

/// A server-persisted prompt/response pair. The client never constructs
/// these; it only renders what the backend returns. The timestamp stays a
/// raw string because the backend may emit naive (timezone-less) datetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub prompt: String,
    pub response: String,
    pub timestamp: String,
}

/// Body of `GET /health`.
#[derive(Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub database: Option<String>,
}

/// HTTP client for the conversation backend.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a prompt and return the AI response text.
    pub async fn ask(&self, prompt: &str) -> Result<String, ApiError> {
        let url = format!("{}/api/ask-ai", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&PromptRequest {
                prompt: prompt.to_string(),
            })
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let body: PromptResponse = response.json().await?;
        Ok(body.response)
    }

    /// Fetch the full stored conversation list, in backend order.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        let url = format!("{}/api/conversations", self.base_url);
        let response = self.client.get(&url).send().await?;

        let response = Self::check_status(response).await?;
        let conversations = response.json().await?;
        Ok(conversations)
    }

    /// Delete every stored conversation server-side.
    pub async fn clear_conversations(&self) -> Result<(), ApiError> {
        let url = format!("{}/api/conversations", self.base_url);
        let response = self.client.delete(&url).send().await?;

        Self::check_status(response).await?;
        Ok(())
    }

    /// Backend health probe.
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        let response = Self::check_status(response).await?;
        let status = response.json().await?;
        Ok(status)
    }

    /// Map a non-success response to an error, preferring the structured
    /// `detail` field when the body decodes as JSON.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| {
                body.get("detail")
                    .and_then(|d| d.as_str())
                    .map(String::from)
            });

        match detail {
            Some(detail) => Err(ApiError::Backend(detail)),
            None => Err(ApiError::Status(status)),
        }
    }
}

/// Format a backend timestamp for display. Accepts RFC 3339 and the naive
/// `YYYY-MM-DDTHH:MM:SS[.ffffff]` form, falling back to a marker string on
/// anything unparseable.
pub fn format_timestamp(raw: &str) -> String {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return ts.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    "invalid date".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let client = BackendClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn formats_rfc3339_timestamps() {
        assert_eq!(
            format_timestamp("2024-05-01T09:30:00Z"),
            "2024-05-01 09:30:00"
        );
    }

    #[test]
    fn formats_naive_timestamps() {
        assert_eq!(
            format_timestamp("2024-05-01T09:30:00.123456"),
            "2024-05-01 09:30:00"
        );
    }

    #[test]
    fn unparseable_timestamp_falls_back() {
        assert_eq!(format_timestamp("not a date"), "invalid date");
    }

    #[test]
    fn conversation_decodes_backend_payload() {
        let json = r#"{
            "id": "abc-123",
            "prompt": "hello",
            "response": "hi there",
            "timestamp": "2024-05-01T09:30:00"
        }"#;
        let conversation: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conversation.id, "abc-123");
        assert_eq!(conversation.prompt, "hello");
    }
}
