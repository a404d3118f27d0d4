//! Desktop notifications
//!
//! Best-effort notifications via notify-send (libnotify). Failures are
//! logged at debug level and never propagate; a missing notification daemon
//! must not affect the session flow.

use std::process::Stdio;
use tokio::process::Command;

/// Send a desktop notification with the given title and body.
pub async fn send(title: &str, body: &str) {
    #[cfg(target_os = "linux")]
    {
        let result = Command::new("notify-send")
            .args(["--app-name=Talkey", "--urgency=low", "--expire-time=3000", title, body])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        if let Err(e) = result {
            tracing::debug!("Failed to send notification: {}", e);
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        tracing::debug!("Notifications not supported on this platform");
        let _ = (title, body); // Suppress unused warnings
    }
}

/// Truncate a transcription for notification display
pub fn preview(text: &str) -> String {
    // Use chars() to handle multi-byte UTF-8 characters
    if text.chars().count() > 80 {
        format!("{}...", text.chars().take(80).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_text_unchanged() {
        assert_eq!(preview("hello world"), "hello world");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long: String = "ä".repeat(100);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), 83);
    }
}
