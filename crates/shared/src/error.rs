use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::MAX_UPLOAD_BYTES;

/// Client-side rejections raised before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a PDF file.")]
    NotPdf { media_type: Option<String> },
    #[error("Please select a resume file.")]
    MissingFile,
    #[error("File size must be less than 10MB.")]
    TooLarge { size_bytes: usize },
    #[error("An analysis is already in progress.")]
    AlreadyUploading,
}

impl ValidationError {
    pub fn too_large(size_bytes: usize) -> Option<Self> {
        (size_bytes > MAX_UPLOAD_BYTES).then_some(Self::TooLarge { size_bytes })
    }
}

/// Error document returned by the analyzer service. Different deployments
/// use `error`, FastAPI's `detail`, or `message`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub detail: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
}

impl ServiceErrorBody {
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }

    /// First non-blank textual message, in `error`, `detail`, `message` order.
    pub fn into_message(self) -> Option<String> {
        [self.error, self.detail, self.message]
            .into_iter()
            .flatten()
            .find_map(|value| match value {
                Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
                _ => None,
            })
    }
}
