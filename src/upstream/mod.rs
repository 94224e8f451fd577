pub mod client;
pub mod models;

pub use client::UpstreamClient;

use axum::http::StatusCode;

/// Failures talking to the upstream API. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("upstream reported failure: {0}")]
    Backend(String),

    #[error("unexpected response structure: {0}")]
    Shape(String),
}

impl UpstreamError {
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Transport(_) => "transport",
            UpstreamError::Status(_) => "status",
            UpstreamError::Backend(_) => "backend",
            UpstreamError::Shape(_) => "shape",
        }
    }

    /// One-line message suitable for showing to a dashboard user.
    pub fn notice(&self) -> String {
        match self {
            UpstreamError::Backend(msg) if !msg.trim().is_empty() => msg.clone(),
            UpstreamError::Backend(_) | UpstreamError::Transport(_) | UpstreamError::Status(_) => {
                "request to upstream failed".to_string()
            }
            UpstreamError::Shape(_) => "upstream returned an unexpected response structure".to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_GATEWAY
    }
}
