use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to build http client: {0}")]
    Client(String),
    #[error("Failed to send request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{message}")]
    Status { status: StatusCode, message: String },
    #[error("Failed to parse response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
}
