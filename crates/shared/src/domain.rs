use serde::{Deserialize, Serialize};

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
/// Largest résumé the analyzer accepts, in bytes (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, PartialEq, Eq)]
pub struct ResumeFile {
    pub file_name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ResumeFile {
    pub fn new(
        file_name: impl Into<String>,
        media_type: Option<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type,
            bytes: bytes.into(),
        }
    }

    /// True when the declared media type is `application/pdf`, ignoring case
    /// and any parameters such as `; charset=...`.
    pub fn is_pdf(&self) -> bool {
        self.media_type
            .as_deref()
            .and_then(|raw| raw.split(';').next())
            .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MEDIA_TYPE))
            .unwrap_or(false)
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn exceeds_upload_limit(&self) -> bool {
        self.size_bytes() > MAX_UPLOAD_BYTES
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            file_name: self.file_name.clone(),
            size_bytes: self.size_bytes(),
        }
    }
}

impl std::fmt::Debug for ResumeFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumeFile")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub file_name: String,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file: ResumeFile,
    pub job_description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl ScoreTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => Self::Excellent,
            60..=79 => Self::Good,
            40..=59 => Self::Fair,
            _ => Self::NeedsImprovement,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::NeedsImprovement => "Needs Improvement",
        }
    }

    pub fn style_class(self) -> &'static str {
        match self {
            Self::Excellent => "score-excellent",
            Self::Good => "score-good",
            Self::Fair => "score-fair",
            Self::NeedsImprovement => "score-poor",
        }
    }
}
