//! Paste-based text output
//!
//! Copies text to the clipboard with wl-copy, then simulates Ctrl+V with
//! ydotool so the text lands at the cursor. Avoids direct typing, which
//! breaks on non-US keyboard layouts.
//!
//! Requires:
//! - wl-copy installed (for clipboard access)
//! - ydotool installed and its daemon running (systemctl --user start ydotool)

use super::clipboard::{command_available, copy_to_clipboard};
use super::TextOutput;
use crate::error::OutputError;
use std::process::Stdio;
use tokio::process::Command;

/// Paste-based text output (clipboard + Ctrl+V)
pub struct PasteOutput;

impl PasteOutput {
    /// Create a new paste output
    pub fn new() -> Self {
        Self
    }

    /// Simulate Ctrl+V using ydotool.
    /// 29 = KEY_LEFTCTRL, 47 = KEY_V; key_code:1 is press, key_code:0 release.
    async fn simulate_ctrl_v(&self) -> Result<(), OutputError> {
        let output = Command::new("ydotool")
            .args(["key", "29:1", "47:1", "47:0", "29:0"])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OutputError::YdotoolNotFound
                } else {
                    OutputError::CtrlVFailed(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OutputError::CtrlVFailed(stderr.trim().to_string()));
        }

        Ok(())
    }
}

impl Default for PasteOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextOutput for PasteOutput {
    async fn publish(&self, text: &str) -> Result<(), OutputError> {
        if text.is_empty() {
            return Ok(());
        }

        copy_to_clipboard(text).await?;
        self.simulate_ctrl_v().await?;

        tracing::info!("Text pasted at cursor ({} chars)", text.chars().count());
        Ok(())
    }

    async fn is_available(&self) -> bool {
        command_available("wl-copy").await && command_available("ydotool").await
    }

    fn name(&self) -> &'static str {
        "paste (wl-copy + ydotool)"
    }
}
