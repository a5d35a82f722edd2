pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid session: {0}")]
    SessionInvalid(String),

    #[error("Question already submitted, no further changes accepted")]
    AlreadySubmitted,

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Session terminated: {0}")]
    Terminated(String),

    #[error("Backend error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a retry could plausibly change the outcome. Business
    /// rejections and malformed payloads are terminal; transport failures,
    /// timeouts and backend 5xx are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Reqwest(_) | Error::Timeout(_) => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
