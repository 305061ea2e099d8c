use anyhow::Context;
use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use shared::{
    domain::{UploadRequest, PDF_MEDIA_TYPE},
    error::ServiceErrorBody,
    protocol::{AnalysisResult, HealthStatus},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{config::ClientSettings, error::AnalyzeError, AnalysisService};

/// HTTP client for the remote ATS analyzer.
#[derive(Clone)]
pub struct AtsApiClient {
    http: Client,
    base_url: String,
    analyze_path: String,
    health_path: String,
}

impl AtsApiClient {
    pub fn new(settings: &ClientSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("failed to build analyzer http client")?;

        info!(base_url = %settings.base_url, "analyzer client initialized");

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            analyze_path: settings.analyze_path.clone(),
            health_path: settings.health_path.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Report links may be absolute or relative to the analyzer base url.
    pub fn resolve_report_url(&self, report_url: &str) -> Result<Url, AnalyzeError> {
        let base = Url::parse(&format!("{}/", self.base_url))?;
        Ok(base.join(report_url.trim())?)
    }

    pub async fn health(&self) -> Result<HealthStatus, AnalyzeError> {
        let url = format!("{}{}", self.base_url, self.health_path);
        let response = self.http.get(&url).send().await?;
        let body = checked_body(response).await?;
        serde_json::from_slice(&body).map_err(|err| AnalyzeError::MalformedResponse(err.to_string()))
    }

    pub async fn download_report(&self, report_url: &str) -> Result<Vec<u8>, AnalyzeError> {
        let url = self.resolve_report_url(report_url)?;
        debug!(%url, "downloading analysis report");
        let response = self.http.get(url.clone()).send().await?;
        let body = checked_body(response).await?;
        info!(%url, size_bytes = body.len(), "analysis report downloaded");
        Ok(body)
    }
}

#[async_trait]
impl AnalysisService for AtsApiClient {
    async fn analyze(&self, request: UploadRequest) -> Result<AnalysisResult, AnalyzeError> {
        let url = format!("{}{}", self.base_url, self.analyze_path);
        let UploadRequest {
            file,
            job_description,
        } = request;
        let size_bytes = file.size_bytes();

        let file_part = multipart::Part::bytes(file.bytes)
            .file_name(file.file_name.clone())
            .mime_str(PDF_MEDIA_TYPE)?;
        let mut form = multipart::Form::new().part("file", file_part);
        let has_job_description = job_description.is_some();
        if let Some(job_description) = job_description {
            form = form.text("job_description", job_description);
        }

        debug!(
            %url,
            file_name = %file.file_name,
            size_bytes,
            has_job_description,
            "sending resume to analyzer"
        );

        let response = self.http.post(&url).multipart(form).send().await?;
        let body = checked_body(response).await?;
        let result = AnalysisResult::from_slice(&body)
            .map_err(|err| AnalyzeError::MalformedResponse(err.to_string()))?;

        if result.is_failure() {
            warn!(%url, "analyzer reported an unsuccessful analysis");
            return Err(AnalyzeError::Rejected {
                status: None,
                message: result.error_message(),
            });
        }

        Ok(result)
    }
}

/// Body of a successful response; non-success statuses become `Rejected`
/// carrying whatever message the service put in its error body.
async fn checked_body(response: Response) -> Result<Vec<u8>, AnalyzeError> {
    let status = response.status();
    let url = response.url().clone();
    let body = response.bytes().await?;

    if !status.is_success() {
        let message = ServiceErrorBody::parse(&body).and_then(ServiceErrorBody::into_message);
        warn!(%url, status = status.as_u16(), ?message, "analyzer returned an error status");
        return Err(AnalyzeError::Rejected {
            status: Some(status.as_u16()),
            message,
        });
    }

    Ok(body.to_vec())
}

#[cfg(test)]
#[path = "tests/api_client_tests.rs"]
mod tests;
