use thiserror::Error;

/// Failures setting up a publisher. Sending never errors; see `PublishOutcome`.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}
