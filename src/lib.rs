//! Terminal client for a document assistant backend: upload documents, chat
//! about them, and view or regenerate charts derived from the replies.

pub mod api;
pub mod backend;
pub mod chart;
pub mod chat;
pub mod config;
pub mod files;
pub mod input;
pub mod mock;
pub mod notify;
pub mod state;
pub mod suggestions;
pub mod upload;

pub use api::{ApiClient, ApiError};
pub use backend::Backend;
pub use chart::{ChartEvent, ChartPayload, ChartViewer};
pub use chat::ChatWindow;
pub use config::Config;
pub use notify::{Level, Notifier};
pub use upload::{UploadEvent, UploadPanel};
