//! Integration tests for the session controller state machine
//!
//! Drive the controller with fake collaborators and assert the properties
//! of the press/release workflow: one session at a time, spurious edges
//! ignored, short recordings discarded, and outputs only written for
//! non-empty successful transcriptions.

use std::sync::{Arc, Mutex};
use talkey::audio::AudioCapture;
use talkey::config::Settings;
use talkey::controller::SessionController;
use talkey::error::{AudioError, OutputError, TranscribeError};
use talkey::hotkey::HotkeyEvent;
use talkey::output::TextOutput;
use talkey::state::AudioBuffer;
use talkey::status::{Status, StatusSink};
use talkey::transcribe::{Transcriber, Transcription, TranscriptionRequest};

/// Capture fake: start/stop bookkeeping plus a canned buffer
struct FakeCapture {
    buffer: AudioBuffer,
    fail_start: bool,
    active: Arc<Mutex<bool>>,
    start_calls: Arc<Mutex<usize>>,
}

impl FakeCapture {
    fn new(buffer: AudioBuffer) -> (Self, Arc<Mutex<usize>>, Arc<Mutex<bool>>) {
        let start_calls = Arc::new(Mutex::new(0));
        let active = Arc::new(Mutex::new(false));
        (
            Self {
                buffer,
                fail_start: false,
                active: active.clone(),
                start_calls: start_calls.clone(),
            },
            start_calls,
            active,
        )
    }

    fn failing() -> Self {
        Self {
            buffer: AudioBuffer::new(),
            fail_start: true,
            active: Arc::new(Mutex::new(false)),
            start_calls: Arc::new(Mutex::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl AudioCapture for FakeCapture {
    async fn start(&mut self) -> Result<(), AudioError> {
        if self.fail_start {
            return Err(AudioError::DeviceUnavailable("device busy".into()));
        }
        let mut active = self.active.lock().unwrap();
        if *active {
            // Idempotent: a second start while active is a no-op
            return Ok(());
        }
        *active = true;
        *self.start_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn stop(&mut self) -> Result<AudioBuffer, AudioError> {
        let mut active = self.active.lock().unwrap();
        if !*active {
            return Ok(AudioBuffer::new());
        }
        *active = false;
        Ok(self.buffer.clone())
    }
}

/// Transcriber fake: canned response, records submitted requests
struct FakeTranscriber {
    response: Result<Transcription, TranscribeError>,
    healthy: bool,
    submitted: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FakeTranscriber {
    fn returning(response: Result<Transcription, TranscribeError>) -> (Arc<Self>, Arc<Mutex<Vec<Vec<u8>>>>) {
        let submitted = Arc::new(Mutex::new(Vec::new()));
        (
            Arc::new(Self {
                response,
                healthy: true,
                submitted: submitted.clone(),
            }),
            submitted,
        )
    }
}

impl Transcriber for FakeTranscriber {
    fn check_health(&self) -> bool {
        self.healthy
    }

    fn submit(&self, request: TranscriptionRequest) -> Result<Transcription, TranscribeError> {
        self.submitted.lock().unwrap().push(request.audio);
        match &self.response {
            Ok(t) => Ok(t.clone()),
            Err(e) => Err(TranscribeError::Other(e.to_string())),
        }
    }
}

/// Status sink fake: records every transition
struct RecordingSink {
    statuses: Arc<Mutex<Vec<Status>>>,
}

impl RecordingSink {
    fn new() -> (Self, Arc<Mutex<Vec<Status>>>) {
        let statuses = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                statuses: statuses.clone(),
            },
            statuses,
        )
    }
}

impl StatusSink for RecordingSink {
    fn set_status(&self, status: Status) {
        self.statuses.lock().unwrap().push(status);
    }
}

/// Output fake: records published texts
struct RecordingOutput {
    texts: Arc<Mutex<Vec<String>>>,
}

impl RecordingOutput {
    fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let texts = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                texts: texts.clone(),
            },
            texts,
        )
    }
}

#[async_trait::async_trait]
impl TextOutput for RecordingOutput {
    async fn publish(&self, text: &str) -> Result<(), OutputError> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn test_settings() -> Settings {
    let mut settings = Settings::default();
    // Keep tests quiet and deterministic
    settings.output.notifications = false;
    settings
}

fn transcription(text: &str) -> Transcription {
    Transcription {
        text: text.to_string(),
        language: Some("en".to_string()),
        language_probability: Some(0.97),
    }
}

struct Harness {
    controller: SessionController,
    start_calls: Arc<Mutex<usize>>,
    submitted: Arc<Mutex<Vec<Vec<u8>>>>,
    statuses: Arc<Mutex<Vec<Status>>>,
    texts: Arc<Mutex<Vec<String>>>,
}

fn harness(buffer: AudioBuffer, response: Result<Transcription, TranscribeError>) -> Harness {
    let (capture, start_calls, _active) = FakeCapture::new(buffer);
    let (transcriber, submitted) = FakeTranscriber::returning(response);
    let (sink, statuses) = RecordingSink::new();
    let (output, texts) = RecordingOutput::new();

    let controller = SessionController::new(
        test_settings(),
        Box::new(capture),
        transcriber,
        Box::new(sink),
        vec![Box::new(output)],
    );

    Harness {
        controller,
        start_calls,
        submitted,
        statuses,
        texts,
    }
}

/// Buffer comfortably above the 1000-byte minimum
fn speech_buffer() -> AudioBuffer {
    (0..4000u32).map(|i| (i % 256) as u8).collect()
}

#[tokio::test]
async fn press_creates_exactly_one_session() {
    let mut h = harness(speech_buffer(), Ok(transcription("hi")));

    h.controller.handle_press().await;
    assert!(h.controller.phase().session().is_some());
    assert!(h.controller.phase().is_recording());

    // Duplicate press is debounced: same session, no second device start
    h.controller.handle_press().await;
    assert!(h.controller.phase().is_recording());
    assert_eq!(*h.start_calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn release_without_press_has_no_effect() {
    let mut h = harness(speech_buffer(), Ok(transcription("hi")));

    h.controller.apply_probe(true);
    assert_eq!(h.controller.phase().status(), Status::Ready);

    let task = h.controller.handle_release().await;
    assert!(task.is_none());
    assert_eq!(h.controller.phase().status(), Status::Ready);
    assert!(h.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn short_recording_is_discarded_without_submission() {
    let mut h = harness(vec![0u8; 10], Ok(transcription("hi")));

    h.controller.handle_press().await;
    let task = h.controller.handle_release().await;

    assert!(task.is_none());
    assert_eq!(h.controller.phase().status(), Status::Ready);
    assert!(h.submitted.lock().unwrap().is_empty());
    assert!(h.texts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn successful_transcription_publishes_exact_text() {
    let mut h = harness(speech_buffer(), Ok(transcription("hello world")));

    h.controller.handle_press().await;
    let task = h.controller.handle_release().await.expect("submission expected");
    assert!(h.controller.phase().is_processing());

    let outcome = task.await.unwrap();
    h.controller.handle_outcome(outcome).await;

    assert_eq!(*h.texts.lock().unwrap(), vec!["hello world".to_string()]);
    assert_eq!(h.controller.phase().status(), Status::Ready);
}

#[tokio::test]
async fn submitted_buffer_matches_captured_bytes() {
    let buffer = speech_buffer();
    let mut h = harness(buffer.clone(), Ok(transcription("hi")));

    h.controller.handle_press().await;
    let task = h.controller.handle_release().await.unwrap();
    task.await.unwrap().unwrap();

    let submitted = h.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0], buffer);
}

#[tokio::test]
async fn empty_transcription_is_not_published() {
    let mut h = harness(speech_buffer(), Ok(transcription("")));

    h.controller.handle_press().await;
    let task = h.controller.handle_release().await.unwrap();
    let outcome = task.await.unwrap();
    h.controller.handle_outcome(outcome).await;

    assert!(h.texts.lock().unwrap().is_empty());
    assert_eq!(h.controller.phase().status(), Status::Ready);
}

#[tokio::test]
async fn timeout_error_returns_to_ready_with_no_output() {
    let mut h = harness(
        speech_buffer(),
        Err(TranscribeError::Timeout("60s elapsed".into())),
    );

    h.controller.handle_press().await;
    let task = h.controller.handle_release().await.unwrap();
    let outcome = task.await.unwrap();
    h.controller.handle_outcome(outcome).await;

    assert!(h.texts.lock().unwrap().is_empty());
    assert_eq!(h.controller.phase().status(), Status::Ready);
}

#[tokio::test]
async fn failed_capture_start_does_not_enter_recording() {
    let (transcriber, _) = FakeTranscriber::returning(Ok(transcription("hi")));
    let (sink, statuses) = RecordingSink::new();

    let mut controller = SessionController::new(
        test_settings(),
        Box::new(FakeCapture::failing()),
        transcriber,
        Box::new(sink),
        Vec::new(),
    );

    controller.apply_probe(true);
    controller.handle_press().await;

    assert_eq!(controller.phase().status(), Status::Ready);
    assert!(!statuses.lock().unwrap().contains(&Status::Recording));
}

#[tokio::test]
async fn health_probe_never_overrides_an_active_session() {
    let mut h = harness(speech_buffer(), Ok(transcription("hi")));

    h.controller.handle_press().await;
    assert_eq!(h.controller.phase().status(), Status::Recording);

    h.controller.apply_probe(false);
    assert_eq!(h.controller.phase().status(), Status::Recording);
    assert_eq!(*h.statuses.lock().unwrap().last().unwrap(), Status::Recording);
}

#[tokio::test]
async fn health_probe_toggles_idle_and_ready_when_no_session() {
    let mut h = harness(speech_buffer(), Ok(transcription("hi")));

    assert_eq!(h.controller.phase().status(), Status::Idle);

    h.controller.apply_probe(false);
    assert_eq!(h.controller.phase().status(), Status::Idle);

    h.controller.apply_probe(true);
    assert_eq!(h.controller.phase().status(), Status::Ready);

    h.controller.apply_probe(false);
    assert_eq!(h.controller.phase().status(), Status::Idle);
}

#[tokio::test]
async fn every_transition_publishes_its_status() {
    let mut h = harness(speech_buffer(), Ok(transcription("hello")));

    h.controller.handle_press().await;
    let task = h.controller.handle_release().await.unwrap();
    let outcome = task.await.unwrap();
    h.controller.handle_outcome(outcome).await;

    assert_eq!(
        *h.statuses.lock().unwrap(),
        vec![Status::Recording, Status::Processing, Status::Ready]
    );
}

#[tokio::test]
async fn run_loop_processes_a_full_cycle_and_shuts_down() {
    let h = harness(speech_buffer(), Ok(transcription("from the loop")));
    let Harness {
        mut controller,
        texts,
        statuses,
        ..
    } = h;

    let (tx, rx) = tokio::sync::mpsc::channel::<HotkeyEvent>(8);

    let runner = tokio::spawn(async move {
        controller.run(rx).await.unwrap();
    });

    tx.send(HotkeyEvent::Pressed).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    tx.send(HotkeyEvent::Released).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    // Closing the channel shuts the controller down
    drop(tx);
    runner.await.unwrap();

    assert_eq!(*texts.lock().unwrap(), vec!["from the loop".to_string()]);

    let recorded = statuses.lock().unwrap();
    assert!(recorded.contains(&Status::Recording));
    assert!(recorded.contains(&Status::Processing));
    // Shutdown always lands on Idle
    assert_eq!(*recorded.last().unwrap(), Status::Idle);
}
