//! Talkey: push-to-talk speech-to-text client
//!
//! This library provides the core functionality for:
//! - Detecting hotkey edges by sampling kernel-level key state via evdev
//! - Capturing microphone audio via cpal (PipeWire, PulseAudio, ALSA)
//! - Shipping the recording to a remote Whisper-style HTTP server
//! - Publishing the transcription via clipboard/paste and a status sink
//!
//! # Architecture
//!
//! ```text
//!   ┌──────────────┐          ┌──────────────────┐
//!   │ HotkeyWatcher│ edges    │ SessionController│ status   ┌────────────┐
//!   │  (sampling)  ├─────────▶│   (tokio select) ├─────────▶│ StatusSink │
//!   └──────────────┘          └───┬─────────▲────┘          └────────────┘
//!                      start/stop │         │ result
//!                                 ▼         │
//!                       ┌──────────────┐  ┌─┴──────────────┐
//!                       │ AudioCapture │  │RemoteTranscriber│
//!                       │    (cpal)    │  │ (ureq, worker)  │
//!                       └──────────────┘  └─────────────────┘
//!                                 │
//!                  [Press] ──▶ record ──▶ [Release] ──▶ submit ──▶ output
//! ```
//!
//! The controller owns the session phase (Idle/Ready/Recording/Processing);
//! the hotkey sampler, the capture callback, and the network submission all
//! run on their own threads or workers so none of them can stall another.

pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod hotkey;
pub mod notification;
pub mod output;
pub mod state;
pub mod status;
pub mod transcribe;

pub use config::{Overrides, Settings};
pub use controller::SessionController;
pub use error::{Result, TalkeyError};
pub use status::Status;
