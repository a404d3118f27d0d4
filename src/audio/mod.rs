//! Audio capture module
//!
//! Provides microphone recording via cpal, which works with PipeWire,
//! PulseAudio, and ALSA backends.

pub mod cpal_capture;

use crate::config::AudioSettings;
use crate::error::AudioError;
use crate::state::AudioBuffer;

/// Trait for audio capture implementations
///
/// Frames delivered by the backend are appended to an internal buffer in
/// arrival order; `stop` returns the exact concatenation of everything
/// delivered since the matching `start`.
#[async_trait::async_trait]
pub trait AudioCapture: Send + Sync {
    /// Acquire the device and begin capturing. Idempotent: calling while
    /// already capturing is a no-op, so a spurious duplicate press edge can
    /// never double-acquire the device.
    async fn start(&mut self) -> Result<(), AudioError>;

    /// Stop capturing and return the accumulated PCM bytes. Callable when
    /// not capturing (no-op, returns empty). No frame is appended after
    /// this returns.
    async fn stop(&mut self) -> Result<AudioBuffer, AudioError>;
}

/// Factory function to create audio capture
pub fn create_capture(settings: &AudioSettings) -> Result<Box<dyn AudioCapture>, AudioError> {
    Ok(Box::new(cpal_capture::CpalCapture::new(settings)))
}
