use shared::error::ValidationError;
use thiserror::Error;

/// Shown when the service gives no usable message of its own.
pub const FALLBACK_ERROR_MESSAGE: &str = "Failed to analyze resume. Please try again.";

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("analyzer rejected the request (status {status:?}): {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        status: Option<u16>,
        message: Option<String>,
    },
    #[error("request to analyzer failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed analyzer response: {0}")]
    MalformedResponse(String),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl AnalyzeError {
    /// Text for the error view: validation text, the server's own message,
    /// or the generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            _ => FALLBACK_ERROR_MESSAGE.to_string(),
        }
    }
}
