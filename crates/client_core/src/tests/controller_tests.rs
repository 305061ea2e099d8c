use super::*;

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::domain::{MAX_UPLOAD_BYTES, PDF_MEDIA_TYPE};
use tokio::{sync::broadcast::error::TryRecvError, time};

use crate::{error::AnalyzeError, view::ResultsView, FALLBACK_ERROR_MESSAGE};

enum Reply {
    Success(Value),
    Rejected(Option<String>),
    Malformed,
}

struct FakeAnalysisService {
    reply: Reply,
    delay: Duration,
    calls: AtomicUsize,
    last_job_description: std::sync::Mutex<Option<String>>,
}

impl FakeAnalysisService {
    fn new(reply: Reply) -> Arc<Self> {
        Self::delayed(reply, Duration::ZERO)
    }

    fn delayed(reply: Reply, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply,
            delay,
            calls: AtomicUsize::new(0),
            last_job_description: std::sync::Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisService for FakeAnalysisService {
    async fn analyze(&self, request: UploadRequest) -> Result<AnalysisResult, AnalyzeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_job_description.lock().expect("lock") = request.job_description;
        if !self.delay.is_zero() {
            time::sleep(self.delay).await;
        }

        match &self.reply {
            Reply::Success(value) => Ok(serde_json::from_value(value.clone()).expect("object")),
            Reply::Rejected(message) => Err(AnalyzeError::Rejected {
                status: Some(400),
                message: message.clone(),
            }),
            Reply::Malformed => Err(AnalyzeError::MalformedResponse("eof".into())),
        }
    }
}

fn controller(service: Arc<FakeAnalysisService>) -> AnalyzeController {
    AnalyzeController::new(service, ProgressSettings::default())
}

fn pdf(name: &str, len: usize) -> ResumeFile {
    ResumeFile::new(name, Some(PDF_MEDIA_TYPE.to_string()), vec![b'%'; len])
}

fn docx() -> ResumeFile {
    ResumeFile::new(
        "resume.docx",
        Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document".into()),
        b"PK".to_vec(),
    )
}

fn drain(rx: &mut broadcast::Receiver<ControllerEvent>) -> Vec<UiState> {
    let mut states = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(ControllerEvent::StateChanged(state)) => states.push(state),
            Ok(ControllerEvent::Rejected(_)) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return states,
        }
    }
}

fn rejections(rx: &mut broadcast::Receiver<ControllerEvent>) -> Vec<String> {
    let mut messages = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(ControllerEvent::Rejected(message)) => messages.push(message),
            Ok(ControllerEvent::StateChanged(_)) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return messages,
        }
    }
}

#[tokio::test]
async fn non_pdf_selection_keeps_previous_file_and_sets_error() {
    let controller = controller(FakeAnalysisService::new(Reply::Malformed));
    controller.select_file(pdf("first.pdf", 10)).await.expect("pdf accepted");

    let err = controller.select_file(docx()).await.expect_err("docx rejected");
    assert!(matches!(err, ValidationError::NotPdf { .. }));

    let snapshot = controller.snapshot().await;
    assert_eq!(
        snapshot.file.map(|file| file.file_name).as_deref(),
        Some("first.pdf")
    );
    assert_eq!(
        snapshot.state,
        UiState::Error("Please select a PDF file.".into())
    );
}

#[tokio::test]
async fn non_pdf_selection_without_previous_file_leaves_form_empty() {
    let controller = controller(FakeAnalysisService::new(Reply::Malformed));
    let untyped = ResumeFile::new("resume", None, b"data".to_vec());
    controller.select_file(untyped).await.expect_err("rejected");

    let snapshot = controller.snapshot().await;
    assert!(snapshot.file.is_none());
    assert!(snapshot.state.error_message().is_some());
}

#[tokio::test]
async fn valid_selection_clears_previous_error() {
    let controller = controller(FakeAnalysisService::new(Reply::Malformed));
    controller.select_file(docx()).await.expect_err("rejected");
    controller.select_file(pdf("cv.pdf", 3)).await.expect("accepted");
    assert_eq!(controller.state().await, UiState::Idle);
}

#[tokio::test]
async fn submit_without_file_fails_without_network_call() {
    let service = FakeAnalysisService::new(Reply::Success(json!({"ats_score": 50})));
    let controller = controller(service.clone());

    let state = controller.submit().await;

    assert_eq!(state, UiState::Error("Please select a resume file.".into()));
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn oversized_file_fails_without_network_call() {
    let service = FakeAnalysisService::new(Reply::Success(json!({"ats_score": 50})));
    let controller = controller(service.clone());
    controller
        .select_file(pdf("big.pdf", MAX_UPLOAD_BYTES + 1))
        .await
        .expect("type is fine");

    let state = controller.submit().await;

    assert_eq!(
        state,
        UiState::Error("File size must be less than 10MB.".into())
    );
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn successful_submit_shows_results() {
    let service = FakeAnalysisService::new(Reply::Success(json!({
        "success": true,
        "ats_score": 85,
        "ats_breakdown": {}
    })));
    let controller = controller(service.clone());
    controller.select_file(pdf("cv.pdf", 64)).await.expect("accepted");
    controller.set_job_description("Senior Rust engineer").await;

    let state = controller.submit().await;

    let UiState::ResultsShown(result) = &state else {
        panic!("expected results, got {state:?}");
    };
    let view = ResultsView::from_result(result);
    assert_eq!(view.tier.label(), "Excellent");
    assert!(view.skills.matched.is_empty());
    assert_eq!(service.calls(), 1);
    assert_eq!(
        service.last_job_description.lock().expect("lock").as_deref(),
        Some("Senior Rust engineer")
    );
}

#[tokio::test]
async fn blank_job_description_is_not_sent() {
    let service = FakeAnalysisService::new(Reply::Success(json!({"ats_score": 40})));
    let controller = controller(service.clone());
    controller.select_file(pdf("cv.pdf", 1)).await.expect("accepted");
    controller.set_job_description("   \n").await;

    controller.submit().await;

    assert_eq!(controller.snapshot().await.job_description, None);
    assert_eq!(*service.last_job_description.lock().expect("lock"), None);
}

#[tokio::test]
async fn server_message_becomes_error_state() {
    let service = FakeAnalysisService::new(Reply::Rejected(Some("bad pdf".into())));
    let controller = controller(service);
    controller.select_file(pdf("cv.pdf", 8)).await.expect("accepted");

    assert_eq!(controller.submit().await, UiState::Error("bad pdf".into()));
}

#[tokio::test]
async fn failures_without_message_use_fallback() {
    for reply in [Reply::Rejected(None), Reply::Malformed] {
        let controller = controller(FakeAnalysisService::new(reply));
        controller.select_file(pdf("cv.pdf", 8)).await.expect("accepted");
        assert_eq!(
            controller.submit().await,
            UiState::Error(FALLBACK_ERROR_MESSAGE.into())
        );
    }
}

#[tokio::test]
async fn reset_after_analysis_returns_to_empty_idle_form() {
    let controller = controller(FakeAnalysisService::new(Reply::Success(
        json!({"ats_score": 66}),
    )));
    controller.select_file(pdf("cv.pdf", 8)).await.expect("accepted");
    controller.set_job_description("Backend role").await;
    assert!(matches!(controller.submit().await, UiState::ResultsShown(_)));

    controller.reset().await;

    assert_eq!(
        controller.snapshot().await,
        FormSnapshot {
            file: None,
            job_description: None,
            state: UiState::Idle,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn progress_is_capped_until_response_and_ticker_stops_after() {
    let service = FakeAnalysisService::delayed(
        Reply::Success(json!({"ats_score": 91})),
        Duration::from_secs(3),
    );
    let controller = controller(service);
    controller.select_file(pdf("cv.pdf", 8)).await.expect("accepted");
    let mut rx = controller.subscribe();

    let state = controller.submit().await;
    assert!(matches!(state, UiState::ResultsShown(_)));

    let states = drain(&mut rx);
    let (uploading, settled) = states.split_at(states.len() - 2);
    let progress: Vec<u8> = uploading
        .iter()
        .map(|state| match state {
            UiState::Uploading { progress } => *progress,
            other => panic!("unexpected state while uploading: {other:?}"),
        })
        .collect();
    assert_eq!(progress.first(), Some(&0));
    assert_eq!(progress.last(), Some(&90));
    assert!(progress.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(settled[0], UiState::Uploading { progress: 100 });
    assert!(matches!(settled[1], UiState::ResultsShown(_)));

    time::sleep(Duration::from_secs(5)).await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn second_submit_while_uploading_is_ignored() {
    let service = FakeAnalysisService::delayed(
        Reply::Success(json!({"ats_score": 50})),
        Duration::from_secs(2),
    );
    let controller = Arc::new(controller(service.clone()));
    controller.select_file(pdf("cv.pdf", 8)).await.expect("accepted");

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit().await }
    });
    time::sleep(Duration::from_millis(500)).await;

    let second = controller.submit().await;
    assert!(second.is_uploading());

    assert!(matches!(
        first.await.expect("join"),
        UiState::ResultsShown(_)
    ));
    assert_eq!(service.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn reset_during_upload_discards_late_result() {
    let service = FakeAnalysisService::delayed(
        Reply::Success(json!({"ats_score": 50})),
        Duration::from_secs(2),
    );
    let controller = Arc::new(controller(service));
    controller.select_file(pdf("cv.pdf", 8)).await.expect("accepted");

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit().await }
    });
    time::sleep(Duration::from_millis(500)).await;
    controller.reset().await;

    assert_eq!(pending.await.expect("join"), UiState::Idle);
    assert_eq!(controller.state().await, UiState::Idle);
}

#[tokio::test(start_paused = true)]
async fn selection_during_upload_is_reported_without_interrupting_it() {
    let service = FakeAnalysisService::delayed(
        Reply::Success(json!({"ats_score": 70})),
        Duration::from_secs(2),
    );
    let controller = Arc::new(controller(service.clone()));
    controller.select_file(pdf("cv.pdf", 8)).await.expect("accepted");

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit().await }
    });
    time::sleep(Duration::from_millis(500)).await;
    let mut rx = controller.subscribe();

    let err = controller.select_file(docx()).await.expect_err("docx rejected");
    assert!(matches!(err, ValidationError::NotPdf { .. }));
    let err = controller
        .select_file(pdf("other.pdf", 8))
        .await
        .expect_err("busy");
    assert_eq!(err, ValidationError::AlreadyUploading);

    assert_eq!(
        rejections(&mut rx),
        vec![
            "Please select a PDF file.".to_string(),
            "An analysis is already in progress.".to_string(),
        ]
    );
    let snapshot = controller.snapshot().await;
    assert!(snapshot.state.is_uploading());
    assert_eq!(
        snapshot.file.map(|file| file.file_name).as_deref(),
        Some("cv.pdf")
    );

    assert!(matches!(
        pending.await.expect("join"),
        UiState::ResultsShown(_)
    ));
    assert_eq!(service.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropped_submit_settles_form_and_allows_retry() {
    let service = FakeAnalysisService::delayed(
        Reply::Success(json!({"ats_score": 70})),
        Duration::from_secs(2),
    );
    let controller = controller(service.clone());
    controller.select_file(pdf("cv.pdf", 8)).await.expect("accepted");

    let timed_out = time::timeout(Duration::from_millis(500), controller.submit()).await;
    assert!(timed_out.is_err());
    time::sleep(Duration::from_secs(5)).await;

    assert_eq!(
        controller.state().await,
        UiState::Error(FALLBACK_ERROR_MESSAGE.into())
    );

    assert!(matches!(controller.submit().await, UiState::ResultsShown(_)));
    assert_eq!(service.calls(), 2);
}
