use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for the recorder
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Missing url parameter")]
    MissingUrl,

    #[error("Failed to start transcoder: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Transcoding error: {0}")]
    Transcode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl RecorderError {
    /// Status code reported to the client while headers are still unsent
    pub fn status_code(&self) -> StatusCode {
        match self {
            RecorderError::MissingUrl => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RecorderError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            RecorderError::Spawn(_) | RecorderError::Transcode(_) => "Recording error".to_string(),
            other => other.to_string(),
        };

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RecorderError>;
