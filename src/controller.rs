//! Session controller - main event loop orchestration
//!
//! Ties the hotkey watcher, audio capture, remote transcriber, status sink,
//! and text output together. The controller is the single writer of the
//! session phase and the published status; every transition publishes the
//! destination status before control returns.
//!
//! Three independently-timed activities meet here: hotkey edges arrive on a
//! channel from the sampling thread, audio frames accumulate inside the
//! capture component, and the transcription submission runs on a blocking
//! worker held as a select branch. A slow or held-open server call therefore
//! never delays edge detection; a press that arrives while a submission is
//! in flight is debounced, not queued.

use crate::audio::AudioCapture;
use crate::config::Settings;
use crate::error::{Result, TalkeyError, TranscribeError};
use crate::hotkey::HotkeyEvent;
use crate::notification;
use crate::output::{self, TextOutput};
use crate::state::{Phase, Session};
use crate::status::StatusSink;
use crate::transcribe::{Transcriber, Transcription, TranscriptionRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// In-flight transcription submission
pub type SubmitTask = JoinHandle<std::result::Result<Transcription, TranscribeError>>;

/// The push-to-talk state machine
pub struct SessionController {
    settings: Settings,
    capture: Box<dyn AudioCapture>,
    transcriber: Arc<dyn Transcriber>,
    status: Box<dyn StatusSink>,
    outputs: Vec<Box<dyn TextOutput>>,
    phase: Phase,
    next_request_id: u64,
}

impl SessionController {
    /// Create a controller over the given collaborators
    pub fn new(
        settings: Settings,
        capture: Box<dyn AudioCapture>,
        transcriber: Arc<dyn Transcriber>,
        status: Box<dyn StatusSink>,
        outputs: Vec<Box<dyn TextOutput>>,
    ) -> Self {
        Self {
            settings,
            capture,
            transcriber,
            status,
            outputs,
            phase: Phase::Idle,
            next_request_id: 1,
        }
    }

    /// Current phase (primarily for tests and the status command)
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Move to a new phase, publishing the matching status before returning
    fn transition(&mut self, phase: Phase) {
        tracing::debug!("Phase: {} -> {}", self.phase, phase);
        self.status.set_status(phase.status());
        self.phase = phase;
    }

    /// Press edge: begin a session unless one already exists
    pub async fn handle_press(&mut self) {
        if !self.phase.accepts_press() {
            // Duplicate press while a session exists: the capture device is
            // still reserved, so the edge is debounced
            tracing::debug!("Press ignored while {}", self.phase);
            return;
        }

        match self.capture.start().await {
            Ok(()) => {
                tracing::info!("Recording started");
                self.transition(Phase::Recording(Session::begin()));
            }
            Err(e) => {
                tracing::error!("Failed to start audio capture: {}", e);
                if self.settings.output.notifications {
                    notification::send("Recording failed", &e.to_string()).await;
                }
                // Phase unchanged: a failed start never leaves us stuck in
                // Recording
            }
        }
    }

    /// Release edge: stop capture and submit the buffer if it is long enough.
    /// Returns the in-flight submission for the event loop to await.
    pub async fn handle_release(&mut self) -> Option<SubmitTask> {
        let session = match &self.phase {
            Phase::Recording(session) => session.clone(),
            _ => {
                tracing::trace!("Release without active recording, ignoring");
                return None;
            }
        };

        tracing::info!("Recording stopped ({:.1}s)", session.elapsed().as_secs_f32());

        let buffer = match self.capture.stop().await {
            Ok(buffer) => buffer,
            Err(e) => {
                tracing::warn!("Recording error: {}", e);
                self.transition(Phase::Ready);
                return None;
            }
        };

        if buffer.len() < self.settings.audio.min_buffer_bytes {
            tracing::info!(
                "Recording too short ({} bytes < {}), discarding",
                buffer.len(),
                self.settings.audio.min_buffer_bytes
            );
            self.transition(Phase::Ready);
            return None;
        }

        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let request = TranscriptionRequest {
            audio: buffer,
            language: self.settings.server.language.clone(),
            timeout: Duration::from_secs(self.settings.server.timeout_secs),
        };

        tracing::info!(
            "Submitting request #{} ({} bytes)",
            request_id,
            request.audio.len()
        );

        let mut session = session;
        session.request_id = Some(request_id);
        self.transition(Phase::Processing(session));

        let transcriber = self.transcriber.clone();
        Some(tokio::task::spawn_blocking(move || transcriber.submit(request)))
    }

    /// Result of the in-flight submission arrived
    pub async fn handle_outcome(
        &mut self,
        outcome: std::result::Result<Transcription, TranscribeError>,
    ) {
        match outcome {
            Ok(result) => {
                if let Some(ref language) = result.language {
                    tracing::info!(
                        "Detected language: {} (probability {:.2})",
                        language,
                        result.language_probability.unwrap_or(0.0)
                    );
                }

                if result.text.is_empty() {
                    tracing::info!("No speech detected");
                } else {
                    self.publish(&result.text).await;
                }
            }
            Err(e) => {
                tracing::error!("Transcription failed: {}", e);
                if self.settings.output.notifications {
                    notification::send("Transcription failed", &e.to_string()).await;
                }
            }
        }

        self.transition(Phase::Ready);
    }

    /// Publish text through the output chain. Best-effort: failure is
    /// logged and never touches the state machine.
    async fn publish(&self, text: &str) {
        if self.outputs.is_empty() {
            tracing::info!("No output configured, transcription: {:?}", text);
            return;
        }

        match output::publish_with_fallback(&self.outputs, text).await {
            Ok(()) => {
                if self.settings.output.notifications {
                    notification::send("Transcribed", &notification::preview(text)).await;
                }
            }
            Err(e) => tracing::warn!("Output failed: {}", e),
        }
    }

    /// Apply a health probe result. Mid-session results are discarded so the
    /// probe can never clobber Recording/Processing status.
    pub fn apply_probe(&mut self, healthy: bool) {
        if self.phase.session().is_some() {
            return;
        }

        match (&self.phase, healthy) {
            (Phase::Idle, true) => {
                tracing::info!("Server reachable");
                self.transition(Phase::Ready);
            }
            (Phase::Ready, false) => {
                tracing::warn!("Server unreachable, waiting for it to come back");
                self.transition(Phase::Idle);
            }
            _ => {}
        }
    }

    /// Run the controller event loop until shutdown.
    ///
    /// Exits on SIGINT/SIGTERM or when the hotkey event channel closes.
    pub async fn run(&mut self, mut hotkey_rx: mpsc::Receiver<HotkeyEvent>) -> Result<()> {
        let combo = self
            .settings
            .hotkey
            .modifiers
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.settings.hotkey.key.as_str()))
            .collect::<Vec<_>>()
            .join("+");
        tracing::info!("Listening for hotkey: {} (hold to record, release to transcribe)", combo);

        // Publish the initial status before any event can arrive
        self.status.set_status(self.phase.status());

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| TalkeyError::Config(format!("Failed to set up SIGTERM handler: {}", e)))?;

        // First tick fires immediately, giving the startup probe
        let mut probe_interval = tokio::time::interval(Duration::from_secs(
            self.settings.server.health_interval_secs,
        ));
        probe_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut pending: Option<SubmitTask> = None;
        let mut probe_task: Option<JoinHandle<bool>> = None;

        loop {
            tokio::select! {
                event = hotkey_rx.recv() => {
                    match event {
                        Some(HotkeyEvent::Pressed) => self.handle_press().await,
                        Some(HotkeyEvent::Released) => {
                            if let Some(task) = self.handle_release().await {
                                pending = Some(task);
                            }
                        }
                        None => {
                            tracing::info!("Hotkey channel closed, shutting down");
                            break;
                        }
                    }
                }

                outcome = async {
                    match pending.as_mut() {
                        Some(task) => task.await,
                        None => std::future::pending().await,
                    }
                }, if pending.is_some() => {
                    pending = None;
                    let outcome = outcome.unwrap_or_else(|e| {
                        Err(TranscribeError::Other(format!("submission task failed: {}", e)))
                    });
                    self.handle_outcome(outcome).await;
                }

                _ = probe_interval.tick() => {
                    if self.phase.session().is_none() && probe_task.is_none() {
                        let transcriber = self.transcriber.clone();
                        probe_task =
                            Some(tokio::task::spawn_blocking(move || transcriber.check_health()));
                    }
                }

                healthy = async {
                    match probe_task.as_mut() {
                        Some(task) => task.await,
                        None => std::future::pending().await,
                    }
                }, if probe_task.is_some() => {
                    probe_task = None;
                    self.apply_probe(healthy.unwrap_or(false));
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down...");
                    break;
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down...");
                    break;
                }
            }
        }

        self.shutdown(pending).await;
        Ok(())
    }

    /// Release resources: stop any active capture, then let an in-flight
    /// submission complete or time out. Never leaks a held audio device.
    async fn shutdown(&mut self, pending: Option<SubmitTask>) {
        if self.phase.is_recording() {
            tracing::info!("Discarding active recording");
        }
        if let Err(e) = self.capture.stop().await {
            tracing::warn!("Failed to stop audio capture: {}", e);
        }

        if let Some(task) = pending {
            tracing::info!("Waiting for in-flight transcription...");
            let bound = Duration::from_secs(self.settings.server.timeout_secs + 5);
            match tokio::time::timeout(bound, task).await {
                Ok(Ok(outcome)) => self.handle_outcome(outcome).await,
                Ok(Err(e)) => tracing::warn!("Submission task failed: {}", e),
                Err(_) => {
                    tracing::warn!("In-flight transcription did not finish in time, abandoning")
                }
            }
        }

        self.transition(Phase::Idle);
        tracing::info!("Controller stopped");
    }
}
