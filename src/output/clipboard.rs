//! Clipboard-based text output
//!
//! Uses wl-copy to copy text to the Wayland clipboard.
//! This is the most reliable method as it works on all Wayland compositors.
//!
//! Requires: wl-clipboard package installed

use super::TextOutput;
use crate::error::OutputError;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Clipboard-based text output
pub struct ClipboardOutput;

impl ClipboardOutput {
    /// Create a new clipboard output
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClipboardOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy text to the clipboard via wl-copy's stdin
pub(super) async fn copy_to_clipboard(text: &str) -> Result<(), OutputError> {
    let mut child = Command::new("wl-copy")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OutputError::WlCopyNotFound
            } else {
                OutputError::CopyFailed(e.to_string())
            }
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .await
            .map_err(|e| OutputError::CopyFailed(e.to_string()))?;

        // Close stdin to signal EOF
        drop(stdin);
    }

    let status = child
        .wait()
        .await
        .map_err(|e| OutputError::CopyFailed(e.to_string()))?;

    if !status.success() {
        return Err(OutputError::CopyFailed("wl-copy exited with error".to_string()));
    }

    Ok(())
}

/// Check whether a command exists in PATH
pub(super) async fn command_available(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

#[async_trait::async_trait]
impl TextOutput for ClipboardOutput {
    async fn publish(&self, text: &str) -> Result<(), OutputError> {
        if text.is_empty() {
            return Ok(());
        }

        copy_to_clipboard(text).await?;

        tracing::info!("Text copied to clipboard ({} chars)", text.chars().count());
        Ok(())
    }

    async fn is_available(&self) -> bool {
        command_available("wl-copy").await
    }

    fn name(&self) -> &'static str {
        "clipboard (wl-copy)"
    }
}
