use crate::error::GatewayError;
use crate::progress::{self, Kind};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::time::Duration;

macro_rules! debug_eprintln {
    ($($arg:tt)*) => {
        if std::env::var("CHARTBOT_DEBUG").is_ok() {
            eprintln!($($arg)*);
        }
    };
}

pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["xlsx", "csv"];

/// Advisory file filter applied when the user picks a file.
pub fn is_supported_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// Await `fut`, then hold its output back for `delay` so replies never land
/// in the same frame as the message that caused them.
pub async fn delayed<F>(fut: F, delay: Duration) -> F::Output
where
    F: Future,
{
    let output = fut.await;
    tokio::time::sleep(delay).await;
    output
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(default)]
    pub chart: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => format!("{} ({})", parsed.error, status),
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => format!("{}: {}", status, body.trim()),
    }
}

/// HTTP client for the analysis backend's `/upload` and `/chat` endpoints.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn with_config(base_url: String) -> Self {
        BackendClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn chat(&self, message: &str) -> Result<ChatReply, GatewayError> {
        let url = format!("{}/chat", self.base_url);
        debug_eprintln!("[Chat] POST {} ({} chars)", url, message.chars().count());
        progress::log_with(Kind::Http, format!("POST {}", url));

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|e| GatewayError::ChatRequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = describe_failure(status, &body);
            debug_eprintln!("[Chat] backend error: {}", detail);
            return Err(GatewayError::ChatRequestFailed(detail));
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| GatewayError::ChatRequestFailed(format!("invalid reply: {}", e)))?;

        debug_eprintln!(
            "[Chat] reply received ({} chars, chart: {})",
            reply.reply.chars().count(),
            reply.chart.is_some()
        );
        Ok(reply)
    }

    pub async fn upload(&self, path: &Path) -> Result<(), GatewayError> {
        let url = format!("{}/upload", self.base_url);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| GatewayError::UploadFailed(format!("not a file: {}", path.display())))?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| GatewayError::UploadFailed(format!("cannot read {}: {}", path.display(), e)))?;

        debug_eprintln!("[Upload] POST {} ({}, {} bytes)", url, file_name, bytes.len());
        progress::log_with(Kind::Http, format!("POST {} ({})", url, file_name));

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| GatewayError::UploadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::UploadFailed(describe_failure(status, &body)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Instant;
    use wiremock::matchers::{body_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_supported_files() {
        assert!(is_supported_file(Path::new("sales.csv")));
        assert!(is_supported_file(Path::new("/tmp/Q3 Report.XLSX")));
        assert!(!is_supported_file(Path::new("notes.txt")));
        assert!(!is_supported_file(Path::new("csv")));
    }

    #[test]
    fn test_trailing_slash_is_dropped() {
        let client = BackendClient::with_config("http://localhost:8000/".to_string());
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_delayed_waits_after_completion() {
        let start = Instant::now();
        let value = delayed(async { 7 }, Duration::from_millis(40)).await;
        assert_eq!(value, 7);
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_chat_reply_with_chart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(serde_json::json!({ "message": "bar chart of region" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "reply": "📊 Bar chart for Region",
                "chart": "data:image/png;base64,iVBORw0KGgo="
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::with_config(server.uri());
        let reply = client.chat("bar chart of region").await.unwrap();
        assert_eq!(reply.reply, "📊 Bar chart for Region");
        assert_eq!(reply.chart.as_deref(), Some("data:image/png;base64,iVBORw0KGgo="));
    }

    #[tokio::test]
    async fn test_chat_reply_without_chart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "reply": "🔢 Total rows: 12" })),
            )
            .mount(&server)
            .await;

        let client = BackendClient::with_config(server.uri());
        let reply = client.chat("rows?").await.unwrap();
        assert_eq!(reply.chart, None);
    }

    #[tokio::test]
    async fn test_chat_server_error_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(serde_json::json!({ "error": "boom" })),
            )
            .mount(&server)
            .await;

        let client = BackendClient::with_config(server.uri());
        match client.chat("hello").await {
            Err(GatewayError::ChatRequestFailed(detail)) => assert!(detail.contains("boom")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chat_unreachable_backend_is_failure() {
        let client = BackendClient::with_config("http://127.0.0.1:9".to_string());
        assert!(matches!(
            client.chat("hello").await,
            Err(GatewayError::ChatRequestFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_sends_file_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(body_string_contains("name=\"file\""))
            .and(body_string_contains("region,sales"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "message": "File uploaded successfully" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "region,sales").unwrap();
        writeln!(file, "north,10").unwrap();

        let client = BackendClient::with_config(server.uri());
        assert_eq!(client.upload(file.path()).await, Ok(()));
    }

    #[tokio::test]
    async fn test_upload_rejected_by_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "error": "No file selected" })),
            )
            .mount(&server)
            .await;

        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let client = BackendClient::with_config(server.uri());
        match client.upload(file.path()).await {
            Err(GatewayError::UploadFailed(detail)) => assert!(detail.contains("No file selected")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_missing_file_fails_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = BackendClient::with_config(server.uri());
        let result = client.upload(Path::new("/definitely/not/here.csv")).await;
        assert!(matches!(result, Err(GatewayError::UploadFailed(_))));
    }
}
