//! Speech-to-text transcription via the remote server
//!
//! The engine itself is out of process: this module only wraps the two
//! HTTP calls the server exposes (health check and submit-audio) behind
//! the [`Transcriber`] trait.

pub mod remote;

use crate::error::TranscribeError;
use std::time::Duration;

/// One submission to the transcription server
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    /// Raw PCM bytes in the configured sample format
    pub audio: Vec<u8>,
    /// Optional language hint (None = server auto-detect)
    pub language: Option<String>,
    /// Client-chosen timeout for this request
    pub timeout: Duration,
}

/// Successful transcription result
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    /// Transcribed text (may be empty when no speech was detected)
    pub text: String,
    /// Language the server detected
    pub language: Option<String>,
    /// Server confidence in the detected language
    pub language_probability: Option<f64>,
}

/// Trait for speech-to-text implementations.
///
/// Calls are blocking from the caller's perspective; the controller runs
/// them on a worker via `spawn_blocking` so the event loop never waits on
/// the network.
pub trait Transcriber: Send + Sync {
    /// Best-effort liveness probe. Never raises; transport problems are
    /// simply `false`.
    fn check_health(&self) -> bool;

    /// Submit audio for transcription. Single attempt, no retry: retrying
    /// is the caller's policy.
    fn submit(&self, request: TranscriptionRequest) -> Result<Transcription, TranscribeError>;
}
