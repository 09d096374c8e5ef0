use thiserror::Error;

/// Everything that can abort a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Calendar feed answered with status {status}")]
    Status { status: reqwest::StatusCode },

    #[error("Invalid calendar document: {0}")]
    Parse(String),

    #[error("Invalid event start: {0}")]
    Start(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create start value errors
pub fn start_error(message: &str) -> Error {
    Error::Start(message.to_string())
}
