//! Upload/analyze controller: owns the form (selected file, job description)
//! and the view state, and drives one analysis request per submit.

use std::sync::Arc;

use shared::{
    domain::{FileSummary, ResumeFile, UploadRequest},
    error::ValidationError,
    protocol::AnalysisResult,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    error::FALLBACK_ERROR_MESSAGE,
    progress::{ProgressSettings, ProgressTicker},
    AnalysisService,
};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum UiState {
    #[default]
    Idle,
    Uploading {
        progress: u8,
    },
    ResultsShown(AnalysisResult),
    Error(String),
}

impl UiState {
    pub fn is_uploading(&self) -> bool {
        matches!(self, Self::Uploading { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    StateChanged(UiState),
    /// A selection refused while an upload is running. The upload state is
    /// left as it is.
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormSnapshot {
    pub file: Option<FileSummary>,
    pub job_description: Option<String>,
    pub state: UiState,
}

#[derive(Default)]
struct FormState {
    file: Option<ResumeFile>,
    job_description: Option<String>,
    ui: UiState,
    /// Bumped by every submit and reset; late completions and ticks from an
    /// older submission are dropped.
    generation: u64,
}

pub struct AnalyzeController {
    service: Arc<dyn AnalysisService>,
    progress: ProgressSettings,
    form: Arc<Mutex<FormState>>,
    events: broadcast::Sender<ControllerEvent>,
}

impl AnalyzeController {
    pub fn new(service: Arc<dyn AnalysisService>, progress: ProgressSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            service,
            progress,
            form: Arc::new(Mutex::new(FormState::default())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> UiState {
        self.form.lock().await.ui.clone()
    }

    pub async fn snapshot(&self) -> FormSnapshot {
        let form = self.form.lock().await;
        FormSnapshot {
            file: form.file.as_ref().map(ResumeFile::summary),
            job_description: form.job_description.clone(),
            state: form.ui.clone(),
        }
    }

    /// Accepts `file` only when it is declared as a PDF and no upload is
    /// running. A rejected file leaves the previous selection in place and
    /// reports an error: as the `Error` state, or as a `Rejected` event while
    /// uploading.
    pub async fn select_file(&self, file: ResumeFile) -> Result<(), ValidationError> {
        let mut form = self.form.lock().await;
        if !file.is_pdf() {
            let err = ValidationError::NotPdf {
                media_type: file.media_type.clone(),
            };
            warn!(file_name = %file.file_name, media_type = ?file.media_type, "rejected non-pdf file");
            self.reject(&mut form, &err);
            return Err(err);
        }

        if form.ui.is_uploading() {
            let err = ValidationError::AlreadyUploading;
            warn!(file_name = %file.file_name, "selection refused while uploading");
            self.reject(&mut form, &err);
            return Err(err);
        }

        debug!(file_name = %file.file_name, size_bytes = file.size_bytes(), "resume selected");
        form.file = Some(file);
        if form.ui.error_message().is_some() {
            self.set_ui(&mut form, UiState::Idle);
        }
        Ok(())
    }

    /// Blank text clears the job description.
    pub async fn set_job_description(&self, text: impl Into<String>) {
        let text = text.into();
        let mut form = self.form.lock().await;
        form.job_description = (!text.trim().is_empty()).then_some(text);
    }

    /// Validates the form, sends one analysis request while the simulated
    /// progress runs, and returns the settled state.
    pub async fn submit(&self) -> UiState {
        let (request, generation) = {
            let mut form = self.form.lock().await;
            if form.ui.is_uploading() {
                warn!("submit ignored: analysis already in progress");
                return form.ui.clone();
            }

            let file = match validated_file(form.file.as_ref()) {
                Ok(file) => file,
                Err(err) => {
                    warn!(error = %err, "submit rejected before sending");
                    let state = UiState::Error(err.to_string());
                    self.set_ui(&mut form, state.clone());
                    return state;
                }
            };

            form.generation += 1;
            let generation = form.generation;
            self.set_ui(&mut form, UiState::Uploading { progress: 0 });
            info!(
                file_name = %file.file_name,
                size_bytes = file.size_bytes(),
                has_job_description = form.job_description.is_some(),
                "submitting resume for analysis"
            );
            let request = UploadRequest {
                file,
                job_description: form.job_description.clone(),
            };
            (request, generation)
        };

        let pending = PendingSubmission {
            form: self.form.clone(),
            events: self.events.clone(),
            generation,
            armed: true,
        };
        let ticker = self.spawn_ticker(generation);
        let outcome = self.service.analyze(request).await;
        ticker.stop().await;

        let mut form = self.form.lock().await;
        pending.disarm();
        if form.generation != generation {
            debug!(generation, "discarding result of a reset submission");
            return form.ui.clone();
        }

        self.set_ui(&mut form, UiState::Uploading { progress: 100 });
        let state = match outcome {
            Ok(result) => {
                info!(score = ?result.raw_score(), "analysis completed");
                UiState::ResultsShown(result)
            }
            Err(err) => {
                warn!(error = %err, "analysis failed");
                UiState::Error(err.user_message())
            }
        };
        self.set_ui(&mut form, state.clone());
        state
    }

    /// Clears file, text, result and error. A request still in flight is not
    /// cancelled, but its outcome is discarded.
    pub async fn reset(&self) {
        let mut form = self.form.lock().await;
        form.file = None;
        form.job_description = None;
        form.generation += 1;
        self.set_ui(&mut form, UiState::Idle);
        debug!("form reset");
    }

    fn spawn_ticker(&self, generation: u64) -> ProgressTicker {
        let form = self.form.clone();
        let events = self.events.clone();
        let settings = self.progress;
        ProgressTicker::spawn(settings.tick, move || {
            advance_progress(form.clone(), events.clone(), generation, settings)
        })
    }

    fn set_ui(&self, form: &mut FormState, state: UiState) {
        form.ui = state.clone();
        let _ = self.events.send(ControllerEvent::StateChanged(state));
    }

    fn reject(&self, form: &mut FormState, err: &ValidationError) {
        if form.ui.is_uploading() {
            let _ = self.events.send(ControllerEvent::Rejected(err.to_string()));
        } else {
            self.set_ui(form, UiState::Error(err.to_string()));
        }
    }
}

/// Armed while a submission awaits its outcome. If the `submit` future is
/// dropped first, the form is moved out of `Uploading` so later submits are
/// not ignored forever.
struct PendingSubmission {
    form: Arc<Mutex<FormState>>,
    events: broadcast::Sender<ControllerEvent>,
    generation: u64,
    armed: bool,
}

impl PendingSubmission {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingSubmission {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        match self.form.try_lock() {
            Ok(mut form) => settle_abandoned(&mut form, &self.events, self.generation),
            Err(_) => {
                let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                    return;
                };
                let form = self.form.clone();
                let events = self.events.clone();
                let generation = self.generation;
                runtime.spawn(async move {
                    settle_abandoned(&mut *form.lock().await, &events, generation);
                });
            }
        }
    }
}

fn settle_abandoned(
    form: &mut FormState,
    events: &broadcast::Sender<ControllerEvent>,
    generation: u64,
) {
    if form.generation != generation || !form.ui.is_uploading() {
        return;
    }
    warn!(generation, "submission dropped before the analysis settled");
    form.ui = UiState::Error(FALLBACK_ERROR_MESSAGE.to_string());
    let _ = events.send(ControllerEvent::StateChanged(form.ui.clone()));
}

fn validated_file(file: Option<&ResumeFile>) -> Result<ResumeFile, ValidationError> {
    let file = file.ok_or(ValidationError::MissingFile)?;
    if let Some(err) = ValidationError::too_large(file.size_bytes()) {
        return Err(err);
    }
    Ok(file.clone())
}

/// One ticker step. Returns `false` once the submission it belongs to is no
/// longer uploading.
async fn advance_progress(
    form: Arc<Mutex<FormState>>,
    events: broadcast::Sender<ControllerEvent>,
    generation: u64,
    settings: ProgressSettings,
) -> bool {
    let mut form = form.lock().await;
    if form.generation != generation {
        return false;
    }
    let UiState::Uploading { progress } = form.ui else {
        return false;
    };

    let next = settings.advance(progress);
    if next != progress {
        debug!(progress = next, "upload progress");
        form.ui = UiState::Uploading { progress: next };
        let _ = events.send(ControllerEvent::StateChanged(form.ui.clone()));
    }
    true
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
