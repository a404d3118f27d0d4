//! evdev-backed key state source
//!
//! Reads key events at the kernel level via /dev/input, so it works on all
//! Wayland compositors. Devices are opened non-blocking; each `poll` drains
//! queued events into a held-key set and answers whether the configured
//! combination is down.
//!
//! The user must be in the 'input' group to access /dev/input/* devices.

use super::KeyStateSource;
use crate::config::HotkeySettings;
use crate::error::HotkeyError;
use evdev::{Device, InputEventKind, Key};
use std::collections::HashSet;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

/// evdev-backed implementation of [`KeyStateSource`]
pub struct EvdevKeySource {
    /// The key that triggers the combination
    target_key: Key,
    /// Modifier keys that must also be held
    modifier_keys: HashSet<Key>,
    /// Open keyboard devices
    devices: Vec<Device>,
    /// Keys currently held across all devices
    held: HashSet<Key>,
}

impl EvdevKeySource {
    /// Create a source for the configured combination
    pub fn new(settings: &HotkeySettings) -> Result<Self, HotkeyError> {
        let target_key = parse_key_name(&settings.key)?;

        let modifier_keys = settings
            .modifiers
            .iter()
            .map(|k| parse_key_name(k))
            .collect::<Result<HashSet<_>, _>>()?;

        let device_paths = find_keyboard_devices()?;
        if device_paths.is_empty() {
            return Err(HotkeyError::NoKeyboard);
        }

        let devices: Vec<Device> = device_paths
            .iter()
            .filter_map(|path| match Device::open(path) {
                Ok(device) => {
                    set_nonblocking(&device);
                    tracing::debug!("Opened device (non-blocking): {:?}", path);
                    Some(device)
                }
                Err(e) => {
                    tracing::warn!("Failed to open {:?}: {}", path, e);
                    None
                }
            })
            .collect();

        if devices.is_empty() {
            return Err(HotkeyError::NoKeyboard);
        }

        tracing::info!(
            "Watching {:?} (with modifiers: {:?}) on {} keyboard device(s)",
            target_key,
            modifier_keys,
            devices.len()
        );

        Ok(Self {
            target_key,
            modifier_keys,
            devices,
            held: HashSet::new(),
        })
    }

    fn combination_down(&self) -> bool {
        self.held.contains(&self.target_key)
            && self.modifier_keys.iter().all(|m| self.held.contains(m))
    }
}

impl KeyStateSource for EvdevKeySource {
    fn poll(&mut self) -> Result<bool, HotkeyError> {
        let mut failure: Option<HotkeyError> = None;

        for device in &mut self.devices {
            match device.fetch_events() {
                Ok(events) => {
                    for event in events {
                        if let InputEventKind::Key(key) = event.kind() {
                            match event.value() {
                                1 => {
                                    self.held.insert(key);
                                }
                                0 => {
                                    self.held.remove(&key);
                                }
                                // Key repeat - no state change
                                _ => {}
                            }
                        }
                    }
                }
                // Non-blocking devices report WouldBlock when idle
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    failure = Some(HotkeyError::Source(e.to_string()));
                }
            }
        }

        match failure {
            // State from the healthy devices was still applied
            Some(e) => Err(e),
            None => Ok(self.combination_down()),
        }
    }
}

/// Switch a device fd to non-blocking mode so fetch_events never stalls
fn set_nonblocking(device: &Device) {
    let fd = device.as_raw_fd();
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags != -1 {
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }
    }
}

/// Find all keyboard input devices
fn find_keyboard_devices() -> Result<Vec<PathBuf>, HotkeyError> {
    let mut keyboards = Vec::new();

    let input_dir = std::fs::read_dir("/dev/input")
        .map_err(|e| HotkeyError::DeviceAccess(format!("/dev/input: {}", e)))?;

    for entry in input_dir {
        let entry = entry.map_err(|e| HotkeyError::DeviceAccess(e.to_string()))?;
        let path = entry.path();

        let is_event_device = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false);

        if !is_event_device {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                // A keyboard should have at least some letter keys
                let has_keys = device
                    .supported_keys()
                    .map(|keys| {
                        keys.contains(Key::KEY_A)
                            && keys.contains(Key::KEY_Z)
                            && keys.contains(Key::KEY_ENTER)
                    })
                    .unwrap_or(false);

                if has_keys {
                    tracing::debug!(
                        "Found keyboard: {:?} ({:?})",
                        path,
                        device.name().unwrap_or("unknown")
                    );
                    keyboards.push(path);
                }
            }
            Err(e) => {
                // Permission denied is common for non-input-group users
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    return Err(HotkeyError::DeviceAccess(path.display().to_string()));
                }
                // Other errors (device busy, etc.) - just skip
                tracing::trace!("Skipping {:?}: {}", path, e);
            }
        }
    }

    Ok(keyboards)
}

/// Parse a key name string to an evdev Key
fn parse_key_name(name: &str) -> Result<Key, HotkeyError> {
    // Normalize: uppercase and replace - or space with _
    let normalized: String = name
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();

    let key_name = if normalized.starts_with("KEY_") {
        normalized
    } else {
        format!("KEY_{}", normalized)
    };

    let key = match key_name.as_str() {
        // Lock keys (good hotkey candidates)
        "KEY_SCROLLLOCK" => Key::KEY_SCROLLLOCK,
        "KEY_PAUSE" => Key::KEY_PAUSE,
        "KEY_CAPSLOCK" => Key::KEY_CAPSLOCK,
        "KEY_NUMLOCK" => Key::KEY_NUMLOCK,
        "KEY_INSERT" => Key::KEY_INSERT,

        // Modifier keys
        "KEY_LEFTALT" | "KEY_LALT" => Key::KEY_LEFTALT,
        "KEY_RIGHTALT" | "KEY_RALT" => Key::KEY_RIGHTALT,
        "KEY_LEFTCTRL" | "KEY_LCTRL" => Key::KEY_LEFTCTRL,
        "KEY_RIGHTCTRL" | "KEY_RCTRL" => Key::KEY_RIGHTCTRL,
        "KEY_LEFTSHIFT" | "KEY_LSHIFT" => Key::KEY_LEFTSHIFT,
        "KEY_RIGHTSHIFT" | "KEY_RSHIFT" => Key::KEY_RIGHTSHIFT,
        "KEY_LEFTMETA" | "KEY_LMETA" | "KEY_SUPER" => Key::KEY_LEFTMETA,
        "KEY_RIGHTMETA" | "KEY_RMETA" => Key::KEY_RIGHTMETA,

        // Function keys (F13-F24 are often unused and make good hotkeys)
        "KEY_F1" => Key::KEY_F1,
        "KEY_F2" => Key::KEY_F2,
        "KEY_F3" => Key::KEY_F3,
        "KEY_F4" => Key::KEY_F4,
        "KEY_F5" => Key::KEY_F5,
        "KEY_F6" => Key::KEY_F6,
        "KEY_F7" => Key::KEY_F7,
        "KEY_F8" => Key::KEY_F8,
        "KEY_F9" => Key::KEY_F9,
        "KEY_F10" => Key::KEY_F10,
        "KEY_F11" => Key::KEY_F11,
        "KEY_F12" => Key::KEY_F12,
        "KEY_F13" => Key::KEY_F13,
        "KEY_F14" => Key::KEY_F14,
        "KEY_F15" => Key::KEY_F15,
        "KEY_F16" => Key::KEY_F16,
        "KEY_F17" => Key::KEY_F17,
        "KEY_F18" => Key::KEY_F18,
        "KEY_F19" => Key::KEY_F19,
        "KEY_F20" => Key::KEY_F20,
        "KEY_F21" => Key::KEY_F21,
        "KEY_F22" => Key::KEY_F22,
        "KEY_F23" => Key::KEY_F23,
        "KEY_F24" => Key::KEY_F24,

        // Navigation keys
        "KEY_HOME" => Key::KEY_HOME,
        "KEY_END" => Key::KEY_END,
        "KEY_PAGEUP" => Key::KEY_PAGEUP,
        "KEY_PAGEDOWN" => Key::KEY_PAGEDOWN,
        "KEY_DELETE" => Key::KEY_DELETE,

        // Common keys that might be used
        "KEY_SPACE" => Key::KEY_SPACE,
        "KEY_ENTER" => Key::KEY_ENTER,
        "KEY_TAB" => Key::KEY_TAB,
        "KEY_BACKSPACE" => Key::KEY_BACKSPACE,
        "KEY_ESC" | "KEY_ESCAPE" => Key::KEY_ESC,
        "KEY_GRAVE" | "KEY_BACKTICK" => Key::KEY_GRAVE,

        _ => {
            return Err(HotkeyError::UnknownKey(format!(
                "{}. Try: SPACE, SCROLLLOCK, PAUSE, F13-F24, or run 'evtest' to find key names",
                name
            )));
        }
    };

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_name() {
        assert_eq!(parse_key_name("SPACE").unwrap(), Key::KEY_SPACE);
        assert_eq!(parse_key_name("space").unwrap(), Key::KEY_SPACE);
        assert_eq!(parse_key_name("KEY_SPACE").unwrap(), Key::KEY_SPACE);
        assert_eq!(parse_key_name("F13").unwrap(), Key::KEY_F13);
        assert_eq!(parse_key_name("LEFTCTRL").unwrap(), Key::KEY_LEFTCTRL);
        assert_eq!(parse_key_name("LShift").unwrap(), Key::KEY_LEFTSHIFT);
    }

    #[test]
    fn test_parse_key_name_error() {
        assert!(parse_key_name("NOT_A_REAL_KEY").is_err());
    }
}
