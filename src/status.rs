//! Session status publication
//!
//! The controller is the single writer of a process-wide [`Status`] value;
//! sinks render the most recent write (last write wins, no queued history).
//! The shipped sink writes the status name to a runtime-dir state file so
//! status bars (Waybar, polybar) can render an indicator from it.

use std::path::PathBuf;

/// User-visible session status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Server not confirmed reachable, no session
    Idle,
    /// Server reachable, waiting for the hotkey
    Ready,
    /// Hotkey held, capturing audio
    Recording,
    /// Audio submitted, awaiting transcription
    Processing,
}

impl Status {
    /// Lowercase name written to the state file
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Ready => "ready",
            Status::Recording => "recording",
            Status::Processing => "processing",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for status transitions. Must not block the caller for more than a
/// negligible duration; rendering may happen elsewhere.
pub trait StatusSink: Send + Sync {
    /// Publish a status transition (last write wins)
    fn set_status(&self, status: Status);
}

/// State-file sink for status-bar integrations
pub struct StateFileSink {
    path: PathBuf,
}

impl StateFileSink {
    /// Create a sink writing to the given path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Remove the state file on shutdown
pub fn cleanup_state_file(path: &std::path::Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove state file: {}", e);
        }
    }
}

impl StatusSink for StateFileSink {
    fn set_status(&self, status: Status) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Failed to create state file directory: {}", e);
                return;
            }
        }

        if let Err(e) = std::fs::write(&self.path, status.as_str()) {
            tracing::warn!("Failed to write state file: {}", e);
        } else {
            tracing::trace!("State file updated: {}", status);
        }
    }
}

/// Sink that only logs transitions, used when the state file is disabled
pub struct LogSink;

impl StatusSink for LogSink {
    fn set_status(&self, status: Status) {
        tracing::trace!("Status: {}", status);
    }
}
