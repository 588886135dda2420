use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::files::FileDescriptor;
use crate::state::{ChartRequest, ChatMessage, ChatRequest, ChatResponse, UploadResponse};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
/// Most files accepted by a single upload
pub const MAX_FILES: usize = 5;
pub const UPLOAD_FALLBACK: &str = "Failed to upload files";

const UPLOAD_CHUNK: usize = 64 * 1024;

/// Receives upload progress as a 0-100 percentage
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Api { status: u16, message: Option<String> },
    #[error("Failed to read {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid request: {0}")]
    Invalid(String),
    #[error("Request task failed: {0}")]
    Task(String),
}

impl ApiError {
    /// Message supplied by the server in the error body, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text to show the user: the server's message when present, else `fallback`
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}

/// Percentage of `loaded` over `total`, rounded. A zero total counts as one byte.
pub fn progress_percent(loaded: u64, total: u64) -> u8 {
    let total = total.max(1);
    let pct = (loaded as f64 * 100.0 / total as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Pull a human-readable message out of an error body.
/// Understands `{"message": ...}` and FastAPI's `{"detail": ...}`.
fn extract_server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    if let Some(msg) = value.get("message").and_then(|m| m.as_str()) {
        return Some(msg.to_string());
    }
    match value.get("detail")? {
        serde_json::Value::String(detail) => Some(detail.clone()),
        serde_json::Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.join("; "))
            }
        }
        _ => None,
    }
}

/// HTTP client for the assistant backend
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload 1-5 files as multipart `files` parts, reporting progress as the
    /// request body is streamed out.
    pub async fn upload_files(
        &self,
        files: &[FileDescriptor],
        on_progress: Option<ProgressFn>,
    ) -> Result<UploadResponse, ApiError> {
        if files.is_empty() || files.len() > MAX_FILES {
            return Err(ApiError::Invalid(format!(
                "expected 1 to {} files, got {}",
                MAX_FILES,
                files.len()
            )));
        }

        let mut contents = Vec::with_capacity(files.len());
        for file in files {
            let bytes = tokio::fs::read(&file.path)
                .await
                .map_err(|source| ApiError::File {
                    path: file.path.clone(),
                    source,
                })?;
            contents.push(bytes);
        }

        let total: u64 = contents.iter().map(|c| c.len() as u64).sum();
        let sent = Arc::new(AtomicU64::new(0));

        let mut form = Form::new();
        for (file, bytes) in files.iter().zip(contents) {
            let length = bytes.len() as u64;
            let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
                bytes.chunks(UPLOAD_CHUNK).map(|c| Ok(c.to_vec())).collect();

            let sent = Arc::clone(&sent);
            let report = on_progress.clone();
            let stream = futures_util::stream::iter(chunks).inspect(move |chunk| {
                if let Ok(chunk) = chunk {
                    let loaded = sent.fetch_add(chunk.len() as u64, Ordering::SeqCst)
                        + chunk.len() as u64;
                    if let Some(report) = &report {
                        report(progress_percent(loaded, total));
                    }
                }
            });

            let part = Part::stream_with_length(Body::wrap_stream(stream), length)
                .file_name(file.name.clone())
                .mime_str(&file.mime)?;
            form = form.part("files", part);
        }

        let url = format!("{}/upload", self.base_url);
        tracing::debug!(%url, count = files.len(), bytes = total, "uploading files");

        let response = self.client.post(&url).multipart(form).send().await?;
        read_response(response).await
    }

    pub async fn send_chat_message(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<ChatResponse, ApiError> {
        let request = ChatRequest {
            message: message.to_string(),
            history: history.to_vec(),
        };
        self.post_json("/chat", &request).await
    }

    pub async fn generate_chart(
        &self,
        prompt: &str,
        data: Option<&serde_json::Value>,
    ) -> Result<ChatResponse, ApiError> {
        let request = ChartRequest {
            prompt: prompt.to_string(),
            data: data.cloned(),
        };
        self.post_json("/chart", &request).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "sending request");

        let response = self.client.post(&url).json(body).send().await?;
        read_response(response).await
    }
}

async fn read_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = extract_server_message(&text);
        tracing::warn!(status = status.as_u16(), message = message.as_deref(), "backend returned error");
        return Err(ApiError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}
