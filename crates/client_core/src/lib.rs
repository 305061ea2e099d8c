use async_trait::async_trait;
use shared::{domain::UploadRequest, protocol::AnalysisResult};

pub mod api_client;
pub mod config;
pub mod controller;
pub mod error;
pub mod files;
pub mod progress;
pub mod view;

pub use api_client::AtsApiClient;
pub use controller::{AnalyzeController, ControllerEvent, FormSnapshot, UiState};
pub use error::{AnalyzeError, FALLBACK_ERROR_MESSAGE};
pub use files::load_resume_file;
pub use view::ResultsView;

/// Remote side of an analysis: one request per call, no retries.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, request: UploadRequest) -> Result<AnalysisResult, AnalyzeError>;
}
