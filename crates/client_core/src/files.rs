use std::path::Path;

use anyhow::Context;
use shared::domain::ResumeFile;

/// Reads a résumé from disk and declares its media type from the extension,
/// the way a browser labels a picked file.
pub async fn load_resume_file(path: impl AsRef<Path>) -> anyhow::Result<ResumeFile> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read resume file '{}'", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "resume.pdf".to_string());
    let media_type = mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string());

    Ok(ResumeFile::new(file_name, media_type, bytes))
}
