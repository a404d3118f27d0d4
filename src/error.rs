//! Error types for talkey
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the talkey application
#[derive(Error, Debug)]
pub enum TalkeyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Audio capture error: {0}")]
    Audio(#[from] AudioError),

    #[error("Transcription error: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to hotkey detection
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("Unknown key name: '{0}'. Use evtest or wev to find valid key names.")]
    UnknownKey(String),

    #[error("No keyboard device found in /dev/input/")]
    NoKeyboard,

    #[error("Input source error: {0}")]
    Source(String),
}

/// Errors related to audio capture
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio device unavailable: {0}. List devices with: pactl list sources short")]
    DeviceUnavailable(String),

    #[error("Audio stream error: {0}")]
    StreamError(String),
}

/// Errors related to the remote transcription call.
///
/// The four transport kinds (Timeout, Unreachable, ServerError, Other) mirror
/// what the server interface can actually fail with; none of them is retried.
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("Server timeout: {0}")]
    Timeout(String),

    #[error("Cannot reach server: {0}. Is the transcription server running?")]
    Unreachable(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Transcription failed: {0}")]
    Other(String),
}

/// Errors related to text output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("wl-copy not found in PATH. Install wl-clipboard via your package manager.")]
    WlCopyNotFound,

    #[error("ydotool not found in PATH. Install via your package manager.")]
    YdotoolNotFound,

    #[error("Ctrl+V simulation failed: {0}")]
    CtrlVFailed(String),

    #[error("Clipboard write failed: {0}")]
    CopyFailed(String),

    #[error("All output methods failed. Ensure wl-copy or ydotool is available.")]
    AllMethodsFailed,
}

/// Result type alias using TalkeyError
pub type Result<T> = std::result::Result<T, TalkeyError>;
