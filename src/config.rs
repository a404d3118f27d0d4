//! Configuration loading and types for talkey
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/talkey/config.toml)
//! 3. Environment variables (TALKEY_*)
//! 4. CLI arguments (highest priority)
//!
//! Layers 3 and 4 are collected into an [`Overrides`] value and applied with
//! [`Settings::merged`], which consumes the base settings and returns a new
//! value. After that the settings are immutable for the rest of the run.

use crate::error::TalkeyError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Talkey Configuration
#
# Location: ~/.config/talkey/config.toml
# All settings can be overridden via TALKEY_* env vars or CLI flags

# State file for status-bar integrations (Waybar, polybar, etc.)
# Use "auto" for default location ($XDG_RUNTIME_DIR/talkey/state),
# a custom path, or "disabled" to turn off. The daemon writes status
# ("idle", "ready", "recording", "processing") to this file on every
# transition. Required for the `talkey status` command.
state_file = "auto"

[hotkey]
# Key to hold for push-to-talk
# Common choices: SPACE (with modifiers), SCROLLLOCK, PAUSE, F13-F24
# Use `evtest` to find key names for your keyboard
key = "SPACE"

# Modifier keys that must also be held
modifiers = ["LEFTCTRL", "LEFTSHIFT"]

# Key state sampling interval in milliseconds. Edges are detected the
# sampling cycle after the underlying state changes.
# poll_interval_ms = 10

[audio]
# Audio input device ("default" uses system default)
# List devices with: pactl list sources short
device = "default"

# Sample rate in Hz (the server's whisper model expects 16000)
sample_rate = 16000

# Channel count (only mono capture is supported)
channels = 1

# Frames per capture chunk
chunk_size = 1024

# PCM sample format: "int16" or "float32"
sample_format = "int16"

# Recordings shorter than this many PCM bytes are discarded without a
# network round trip (too short to contain speech)
# min_buffer_bytes = 1000

[server]
# Base URL of the transcription server
url = "http://localhost:5000"

# Language hint sent with each request ("auto" lets the server detect)
# language = "en"

# Per-request transcription timeout in seconds
# timeout_secs = 60

# Health check timeout in seconds
# health_timeout_secs = 5

# Seconds between periodic health probes (skipped while a session is active)
# health_interval_secs = 15

[output]
# Copy transcribed text to the clipboard (wl-copy)
copy_to_clipboard = true

# Also paste it at the cursor with Ctrl+V (requires ydotool daemon)
auto_paste = false

# Show desktop notifications for results and errors
notifications = true
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub hotkey: HotkeySettings,
    pub audio: AudioSettings,
    pub server: ServerSettings,
    pub output: OutputSettings,

    /// Optional path to the state file for status-bar integrations.
    /// "auto" resolves to $XDG_RUNTIME_DIR/talkey/state.
    #[serde(default = "default_state_file")]
    pub state_file: Option<String>,
}

/// Hotkey detection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HotkeySettings {
    /// Key name (evdev KEY_* constant name, without the KEY_ prefix)
    #[serde(default = "default_hotkey_key")]
    pub key: String,

    /// Modifier keys that must also be held
    #[serde(default = "default_hotkey_modifiers")]
    pub modifiers: Vec<String>,

    /// Key state sampling interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Audio capture configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioSettings {
    /// PipeWire/PulseAudio device name, or "default"
    pub device: String,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel count (mono only for now)
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Frames per capture chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// PCM sample format for the captured buffer
    #[serde(default)]
    pub sample_format: SampleFormat,

    /// Recordings shorter than this many bytes are discarded
    #[serde(default = "default_min_buffer_bytes")]
    pub min_buffer_bytes: usize,
}

/// PCM sample format for captured audio
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// 16-bit signed integer, little-endian
    #[default]
    #[serde(rename = "int16")]
    Int16,
    /// 32-bit float, little-endian
    #[serde(rename = "float32")]
    Float32,
}

impl SampleFormat {
    /// Bytes per sample on the wire
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::Int16 => 2,
            SampleFormat::Float32 => 4,
        }
    }
}

/// Remote transcription server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    /// Base URL of the transcription server
    pub url: String,

    /// Language hint sent with each request (None = server auto-detect)
    #[serde(default)]
    pub language: Option<String>,

    /// Per-request transcription timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Health check timeout in seconds
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,

    /// Seconds between periodic health probes
    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,
}

/// Text output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputSettings {
    /// Copy transcribed text to the clipboard
    #[serde(default = "default_true")]
    pub copy_to_clipboard: bool,

    /// Paste the text at the cursor with Ctrl+V after copying
    #[serde(default)]
    pub auto_paste: bool,

    /// Show desktop notifications for results and errors
    #[serde(default = "default_true")]
    pub notifications: bool,
}

fn default_hotkey_key() -> String {
    "SPACE".to_string()
}

fn default_hotkey_modifiers() -> Vec<String> {
    vec!["LEFTCTRL".to_string(), "LEFTSHIFT".to_string()]
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_channels() -> u16 {
    1
}

fn default_chunk_size() -> u32 {
    1024
}

fn default_min_buffer_bytes() -> usize {
    1000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_health_timeout_secs() -> u64 {
    5
}

fn default_health_interval_secs() -> u64 {
    15
}

fn default_state_file() -> Option<String> {
    Some("auto".to_string())
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hotkey: HotkeySettings {
                key: default_hotkey_key(),
                modifiers: default_hotkey_modifiers(),
                poll_interval_ms: default_poll_interval_ms(),
            },
            audio: AudioSettings {
                device: "default".to_string(),
                sample_rate: 16000,
                channels: 1,
                chunk_size: default_chunk_size(),
                sample_format: SampleFormat::Int16,
                min_buffer_bytes: default_min_buffer_bytes(),
            },
            server: ServerSettings {
                url: "http://localhost:5000".to_string(),
                language: None,
                timeout_secs: default_timeout_secs(),
                health_timeout_secs: default_health_timeout_secs(),
                health_interval_secs: default_health_interval_secs(),
            },
            output: OutputSettings {
                copy_to_clipboard: true,
                auto_paste: false,
                notifications: true,
            },
            state_file: default_state_file(),
        }
    }
}

/// Overrides collected from environment variables and CLI arguments.
///
/// Applied in one place with [`Settings::merged`] so there is exactly one
/// point where layered configuration becomes the final immutable value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server_url: Option<String>,
    pub hotkey: Option<String>,
    pub language: Option<String>,
    pub clipboard_only: bool,
}

impl Overrides {
    /// Collect overrides from TALKEY_* environment variables
    pub fn from_env() -> Self {
        Self {
            server_url: std::env::var("TALKEY_SERVER_URL").ok(),
            hotkey: std::env::var("TALKEY_HOTKEY").ok(),
            language: std::env::var("TALKEY_LANGUAGE").ok(),
            clipboard_only: false,
        }
    }

    /// Layer another set of overrides on top of this one
    pub fn layered(mut self, other: Overrides) -> Self {
        if other.server_url.is_some() {
            self.server_url = other.server_url;
        }
        if other.hotkey.is_some() {
            self.hotkey = other.hotkey;
        }
        if other.language.is_some() {
            self.language = other.language;
        }
        self.clipboard_only |= other.clipboard_only;
        self
    }
}

impl Settings {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "talkey")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the runtime directory for ephemeral files (state file)
    pub fn runtime_dir() -> PathBuf {
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join("talkey")
    }

    /// Resolve the state file path from config.
    /// Returns None if state_file is explicitly disabled.
    pub fn resolve_state_file(&self) -> Option<PathBuf> {
        self.state_file.as_ref().and_then(|path| {
            match path.to_lowercase().as_str() {
                "disabled" | "none" | "off" | "false" => None,
                "auto" => Some(Self::runtime_dir().join("state")),
                _ => Some(PathBuf::from(path)),
            }
        })
    }

    /// Apply overrides, consuming self and producing the final settings value
    pub fn merged(mut self, overrides: &Overrides) -> Settings {
        if let Some(ref url) = overrides.server_url {
            self.server.url = url.clone();
        }
        if let Some(ref key) = overrides.hotkey {
            self.hotkey.key = key.clone();
        }
        if let Some(ref lang) = overrides.language {
            self.server.language = match lang.as_str() {
                "auto" | "" => None,
                _ => Some(lang.clone()),
            };
        }
        if overrides.clipboard_only {
            self.output.copy_to_clipboard = true;
            self.output.auto_paste = false;
        }
        self
    }

    /// Validate settings that cannot be checked by the type system
    pub fn validate(&self) -> std::result::Result<(), TalkeyError> {
        if !self.server.url.starts_with("http://") && !self.server.url.starts_with("https://") {
            return Err(TalkeyError::Config(format!(
                "server.url must start with http:// or https://, got: {}",
                self.server.url
            )));
        }
        if self.audio.channels != 1 {
            return Err(TalkeyError::Config(format!(
                "audio.channels = {} is not supported (only mono capture)",
                self.audio.channels
            )));
        }
        if self.audio.sample_rate == 0 {
            return Err(TalkeyError::Config("audio.sample_rate must be non-zero".into()));
        }
        if self.hotkey.poll_interval_ms == 0 {
            return Err(TalkeyError::Config(
                "hotkey.poll_interval_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_settings(path: Option<&Path>) -> std::result::Result<Settings, TalkeyError> {
    let mut settings = Settings::default();

    let config_path = path.map(PathBuf::from).or_else(Settings::default_path);

    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| TalkeyError::Config(format!("Failed to read config: {}", e)))?;

            settings = toml::from_str(&contents)
                .map_err(|e| TalkeyError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.hotkey.key, "SPACE");
        assert_eq!(settings.hotkey.modifiers, vec!["LEFTCTRL", "LEFTSHIFT"]);
        assert_eq!(settings.audio.sample_rate, 16000);
        assert_eq!(settings.audio.sample_format, SampleFormat::Int16);
        assert_eq!(settings.audio.min_buffer_bytes, 1000);
        assert_eq!(settings.server.url, "http://localhost:5000");
        assert_eq!(settings.server.timeout_secs, 60);
        assert!(settings.output.copy_to_clipboard);
        assert!(!settings.output.auto_paste);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_default_config_template_parses_to_defaults() {
        let parsed: Settings = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed.hotkey.key, Settings::default().hotkey.key);
        assert_eq!(parsed.server.url, Settings::default().server.url);
        assert_eq!(parsed.audio.chunk_size, Settings::default().audio.chunk_size);
    }

    #[test]
    fn test_parse_settings_toml() {
        let toml_str = r#"
            [hotkey]
            key = "F13"
            modifiers = []
            poll_interval_ms = 5

            [audio]
            device = "default"
            sample_rate = 16000
            sample_format = "float32"

            [server]
            url = "http://192.168.1.20:5000"
            language = "en"
            timeout_secs = 30

            [output]
            copy_to_clipboard = true
            auto_paste = true
            notifications = false
        "#;

        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.hotkey.key, "F13");
        assert!(settings.hotkey.modifiers.is_empty());
        assert_eq!(settings.hotkey.poll_interval_ms, 5);
        assert_eq!(settings.audio.sample_format, SampleFormat::Float32);
        assert_eq!(settings.audio.chunk_size, 1024); // default
        assert_eq!(settings.server.url, "http://192.168.1.20:5000");
        assert_eq!(settings.server.language.as_deref(), Some("en"));
        assert_eq!(settings.server.timeout_secs, 30);
        assert_eq!(settings.server.health_timeout_secs, 5); // default
        assert!(settings.output.auto_paste);
        assert!(!settings.output.notifications);
    }

    #[test]
    fn test_merged_overrides() {
        let overrides = Overrides {
            server_url: Some("http://gpu-box:5000".to_string()),
            hotkey: Some("PAUSE".to_string()),
            language: Some("de".to_string()),
            clipboard_only: true,
        };

        let settings = Settings::default().merged(&overrides);
        assert_eq!(settings.server.url, "http://gpu-box:5000");
        assert_eq!(settings.hotkey.key, "PAUSE");
        assert_eq!(settings.server.language.as_deref(), Some("de"));
        assert!(settings.output.copy_to_clipboard);
        assert!(!settings.output.auto_paste);
    }

    #[test]
    fn test_merged_language_auto_clears_hint() {
        let overrides = Overrides {
            language: Some("auto".to_string()),
            ..Overrides::default()
        };
        let base = {
            let mut s = Settings::default();
            s.server.language = Some("en".to_string());
            s
        };
        let settings = base.merged(&overrides);
        assert!(settings.server.language.is_none());
    }

    #[test]
    fn test_layered_overrides() {
        let env = Overrides {
            server_url: Some("http://from-env:5000".to_string()),
            hotkey: Some("PAUSE".to_string()),
            ..Overrides::default()
        };
        let cli = Overrides {
            server_url: Some("http://from-cli:5000".to_string()),
            ..Overrides::default()
        };

        let merged = env.layered(cli);
        assert_eq!(merged.server_url.as_deref(), Some("http://from-cli:5000"));
        assert_eq!(merged.hotkey.as_deref(), Some("PAUSE"));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut settings = Settings::default();
        settings.server.url = "localhost:5000".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_stereo() {
        let mut settings = Settings::default();
        settings.audio.channels = 2;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_resolve_state_file_disabled() {
        let mut settings = Settings::default();
        settings.state_file = Some("disabled".to_string());
        assert!(settings.resolve_state_file().is_none());

        settings.state_file = Some("/tmp/talkey-state".to_string());
        assert_eq!(
            settings.resolve_state_file(),
            Some(PathBuf::from("/tmp/talkey-state"))
        );
    }

    #[test]
    fn test_load_settings_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [hotkey]
            key = "SCROLLLOCK"
            modifiers = []

            [audio]
            device = "default"
            sample_rate = 16000

            [server]
            url = "http://localhost:9000"

            [output]
            "#,
        )
        .unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.hotkey.key, "SCROLLLOCK");
        assert_eq!(settings.server.url, "http://localhost:9000");
    }

    #[test]
    fn test_sample_format_bytes() {
        assert_eq!(SampleFormat::Int16.bytes_per_sample(), 2);
        assert_eq!(SampleFormat::Float32.bytes_per_sample(), 4);
    }
}
