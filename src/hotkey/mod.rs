//! Hotkey edge detection
//!
//! A [`KeyStateSource`] reports whether the configured key combination is
//! currently held; the [`HotkeyWatcher`] samples it on a dedicated thread at
//! a fixed interval (default 10 ms) and emits de-duplicated press/release
//! edges. Sampling against last-known state is the only detection mechanism,
//! so an edge can never fire twice for one physical transition.
//!
//! On Linux the source reads kernel-level key events via evdev, which works
//! on all Wayland compositors. Requires the user to be in the 'input' group.

#[cfg(target_os = "linux")]
pub mod evdev_source;

use crate::config::HotkeySettings;
use crate::error::HotkeyError;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Events emitted by the hotkey watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The combination transitioned released → pressed
    Pressed,
    /// The combination transitioned pressed → released
    Released,
}

/// Source of raw key state for the watcher to sample.
///
/// `poll` drains whatever events the backend has queued and answers "is the
/// configured combination held right now". Errors are reported to the
/// watcher, which logs and keeps sampling; a source error is never fatal.
pub trait KeyStateSource: Send {
    fn poll(&mut self) -> Result<bool, HotkeyError>;
}

/// Sampling edge detector over a [`KeyStateSource`]
pub struct HotkeyWatcher {
    source: Option<Box<dyn KeyStateSource>>,
    interval: Duration,
    stop_signal: Option<oneshot::Sender<()>>,
}

impl HotkeyWatcher {
    /// Create a watcher over the given source
    pub fn new(source: Box<dyn KeyStateSource>, interval: Duration) -> Self {
        Self {
            source: Some(source),
            interval,
            stop_signal: None,
        }
    }

    /// Start sampling. Returns the edge event receiver.
    pub fn start(&mut self) -> Result<mpsc::Receiver<HotkeyEvent>, HotkeyError> {
        let source = self
            .source
            .take()
            .ok_or_else(|| HotkeyError::Source("watcher already started".into()))?;

        let (tx, rx) = mpsc::channel(32);
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_signal = Some(stop_tx);

        let interval = self.interval;
        std::thread::spawn(move || {
            sample_loop(source, interval, tx, stop_rx);
        });

        Ok(rx)
    }

    /// Stop sampling and let the thread wind down
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
    }
}

/// Sampling loop running on a dedicated thread
fn sample_loop(
    mut source: Box<dyn KeyStateSource>,
    interval: Duration,
    tx: mpsc::Sender<HotkeyEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut held = false;

    tracing::debug!("Hotkey sampler started ({}ms interval)", interval.as_millis());

    loop {
        match stop_rx.try_recv() {
            Ok(_) | Err(oneshot::error::TryRecvError::Closed) => {
                tracing::debug!("Hotkey sampler stopping");
                return;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        match source.poll() {
            Ok(down) if down != held => {
                held = down;
                let event = if down {
                    HotkeyEvent::Pressed
                } else {
                    HotkeyEvent::Released
                };
                tracing::debug!("Hotkey {:?}", event);
                if tx.blocking_send(event).is_err() {
                    return; // Channel closed
                }
            }
            Ok(_) => {}
            Err(e) => {
                // Not fatal: keep polling, back off a little so a wedged
                // device does not spam the log
                tracing::warn!("Hotkey input source error: {}", e);
                std::thread::sleep(interval.saturating_mul(10));
            }
        }

        std::thread::sleep(interval);
    }
}

/// Factory function to create the platform hotkey watcher
#[cfg(target_os = "linux")]
pub fn create_watcher(settings: &HotkeySettings) -> Result<HotkeyWatcher, HotkeyError> {
    let source = Box::new(evdev_source::EvdevKeySource::new(settings)?);
    Ok(HotkeyWatcher::new(
        source,
        Duration::from_millis(settings.poll_interval_ms),
    ))
}

#[cfg(not(target_os = "linux"))]
pub fn create_watcher(_settings: &HotkeySettings) -> Result<HotkeyWatcher, HotkeyError> {
    Err(HotkeyError::Source(
        "built-in hotkey detection is only supported on Linux".to_string(),
    ))
}
