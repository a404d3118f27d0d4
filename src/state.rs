//! State machine types for the talkey controller
//!
//! Defines the phases of the push-to-talk workflow:
//! Idle → Ready → Recording → Processing → Ready
//!
//! A [`Session`] covers one press-to-release cycle and exists exactly while
//! the phase is Recording or Processing; there is never more than one.

use crate::status::Status;
use std::time::Instant;

/// Captured PCM audio, little-endian bytes in the configured sample format
pub type AudioBuffer = Vec<u8>;

/// One press-to-release recording cycle
#[derive(Debug, Clone)]
pub struct Session {
    /// When the press edge arrived
    pub started_at: Instant,
    /// Handle for the in-flight transcription request, once submitted
    pub request_id: Option<u64>,
}

impl Session {
    /// Create a session for a press edge that just arrived
    pub fn begin() -> Self {
        Self {
            started_at: Instant::now(),
            request_id: None,
        }
    }

    /// Time since the press edge
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

/// Controller phase
#[derive(Debug, Clone)]
pub enum Phase {
    /// Server not (yet) confirmed reachable, no session
    Idle,

    /// Server reachable, waiting for a press edge
    Ready,

    /// Hotkey held, session capturing audio
    Recording(Session),

    /// Session's buffer submitted, awaiting the result
    Processing(Session),
}

impl Phase {
    /// Check whether a press edge may start a new session
    pub fn accepts_press(&self) -> bool {
        matches!(self, Phase::Idle | Phase::Ready)
    }

    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        matches!(self, Phase::Recording(_))
    }

    /// Check if a submission is in flight
    pub fn is_processing(&self) -> bool {
        matches!(self, Phase::Processing(_))
    }

    /// The active session, if one exists
    pub fn session(&self) -> Option<&Session> {
        match self {
            Phase::Recording(session) | Phase::Processing(session) => Some(session),
            _ => None,
        }
    }

    /// The status to publish for this phase
    pub fn status(&self) -> Status {
        match self {
            Phase::Idle => Status::Idle,
            Phase::Ready => Status::Ready,
            Phase::Recording(_) => Status::Recording,
            Phase::Processing(_) => Status::Processing,
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Ready => write!(f, "Ready"),
            Phase::Recording(session) => {
                write!(f, "Recording ({:.1}s)", session.elapsed().as_secs_f32())
            }
            Phase::Processing(session) => match session.request_id {
                Some(id) => write!(f, "Processing (request #{})", id),
                None => write!(f, "Processing"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_phase_is_idle() {
        let phase = Phase::default();
        assert!(phase.accepts_press());
        assert!(phase.session().is_none());
        assert_eq!(phase.status(), Status::Idle);
    }

    #[test]
    fn test_session_exists_iff_recording_or_processing() {
        assert!(Phase::Idle.session().is_none());
        assert!(Phase::Ready.session().is_none());
        assert!(Phase::Recording(Session::begin()).session().is_some());
        assert!(Phase::Processing(Session::begin()).session().is_some());
    }

    #[test]
    fn test_active_phases_reject_press() {
        assert!(!Phase::Recording(Session::begin()).accepts_press());
        assert!(!Phase::Processing(Session::begin()).accepts_press());
        assert!(Phase::Ready.accepts_press());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Phase::Ready.status(), Status::Ready);
        assert_eq!(Phase::Recording(Session::begin()).status(), Status::Recording);
        assert_eq!(
            Phase::Processing(Session::begin()).status(),
            Status::Processing
        );
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(format!("{}", Phase::Idle), "Idle");
        assert!(format!("{}", Phase::Recording(Session::begin())).starts_with("Recording"));

        let mut session = Session::begin();
        session.request_id = Some(3);
        assert_eq!(
            format!("{}", Phase::Processing(session)),
            "Processing (request #3)"
        );
    }
}
