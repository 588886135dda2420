//! Dispatch between the real HTTP backend and the in-process mock.

use crate::api::{ApiClient, ApiError, ProgressFn};
use crate::files::FileDescriptor;
use crate::mock::MockBackend;
use crate::state::{ChatMessage, ChatResponse, UploadResponse};

#[derive(Clone)]
pub enum Backend {
    Http(ApiClient),
    Mock(MockBackend),
}

impl Backend {
    pub fn display_name(&self) -> String {
        match self {
            Backend::Http(client) => client.base_url().to_string(),
            Backend::Mock(_) => "mock backend".to_string(),
        }
    }

    pub async fn upload_files(
        &self,
        files: &[FileDescriptor],
        on_progress: Option<ProgressFn>,
    ) -> Result<UploadResponse, ApiError> {
        match self {
            Backend::Http(client) => client.upload_files(files, on_progress).await,
            Backend::Mock(mock) => mock.upload_files(files, on_progress).await,
        }
    }

    pub async fn send_chat_message(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<ChatResponse, ApiError> {
        match self {
            Backend::Http(client) => client.send_chat_message(message, history).await,
            Backend::Mock(mock) => mock.send_chat_message(message, history).await,
        }
    }

    pub async fn generate_chart(
        &self,
        prompt: &str,
        data: Option<&serde_json::Value>,
    ) -> Result<ChatResponse, ApiError> {
        match self {
            Backend::Http(client) => client.generate_chart(prompt, data).await,
            Backend::Mock(mock) => mock.generate_chart(prompt, data).await,
        }
    }
}
