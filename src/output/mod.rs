//! Text output module
//!
//! Publishes transcribed text via the clipboard, optionally pasting it at
//! the cursor. Publishing is best-effort: a failure is logged by the caller
//! and never affects the session state machine.
//!
//! Chain for `auto_paste = true`:
//! 1. paste - wl-copy + Ctrl+V via ydotool
//! 2. clipboard - plain wl-copy, if the paste step fails

pub mod clipboard;
pub mod paste;

use crate::config::OutputSettings;
use crate::error::OutputError;

/// Trait for text output implementations
#[async_trait::async_trait]
pub trait TextOutput: Send + Sync {
    /// Publish text (copy and/or paste it)
    async fn publish(&self, text: &str) -> Result<(), OutputError>;

    /// Check if this output method is available
    async fn is_available(&self) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Factory function that returns a fallback chain of output methods.
/// Empty when both toggles are off (transcriptions are then log-only).
pub fn create_output_chain(settings: &OutputSettings) -> Vec<Box<dyn TextOutput>> {
    let mut chain: Vec<Box<dyn TextOutput>> = Vec::new();

    if settings.auto_paste {
        chain.push(Box::new(paste::PasteOutput::new()));
    }
    if settings.copy_to_clipboard || settings.auto_paste {
        // Plain clipboard doubles as the fallback when pasting fails
        chain.push(Box::new(clipboard::ClipboardOutput::new()));
    }

    chain
}

/// Try each output method in the chain until one succeeds
pub async fn publish_with_fallback(
    chain: &[Box<dyn TextOutput>],
    text: &str,
) -> Result<(), OutputError> {
    for output in chain {
        if !output.is_available().await {
            tracing::debug!("{} not available, trying next", output.name());
            continue;
        }

        match output.publish(text).await {
            Ok(()) => {
                tracing::debug!("Text published via {}", output.name());
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("{} failed: {}, trying next", output.name(), e);
            }
        }
    }

    Err(OutputError::AllMethodsFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputSettings;

    #[test]
    fn test_chain_for_clipboard_only() {
        let settings = OutputSettings {
            copy_to_clipboard: true,
            auto_paste: false,
            notifications: true,
        };
        let chain = create_output_chain(&settings);
        assert_eq!(chain.len(), 1);
        assert!(chain[0].name().contains("clipboard"));
    }

    #[test]
    fn test_chain_for_auto_paste_has_clipboard_fallback() {
        let settings = OutputSettings {
            copy_to_clipboard: false,
            auto_paste: true,
            notifications: true,
        };
        let chain = create_output_chain(&settings);
        assert_eq!(chain.len(), 2);
        assert!(chain[0].name().contains("paste"));
    }

    #[test]
    fn test_chain_empty_when_disabled() {
        let settings = OutputSettings {
            copy_to_clipboard: false,
            auto_paste: false,
            notifications: false,
        };
        assert!(create_output_chain(&settings).is_empty());
    }
}
