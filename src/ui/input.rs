//! # Knob Input
//!
//! Knob events come from one of two sources:
//!
//! - **stdin**: one command per line (`+`/`u`/`up`, `-`/`d`/`down`,
//!   empty or `ok`, `q`/`back`)
//! - **evdev**: a keypad or rotary encoder under `/dev/input`
//!   (`KEY_UP`, `KEY_DOWN`, `KEY_ENTER`/`KEY_OK`, `KEY_ESC`/`KEY_BACK`,
//!   or `REL_DIAL` rotation)
//!
//! Both are read on a dedicated thread and delivered over a tokio channel.

use std::io::{self, BufRead};
use std::path::Path;
use std::thread;

use evdev::{Device, InputEventKind, Key, RelativeAxisType};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::UiConfig;
use crate::error::{Result, ShockError};

/// Channel depth between the input thread and the UI loop
const INPUT_CHANNEL_CAPACITY: usize = 16;

/// evdev key value for a press (1) and autorepeat (2); release is 0
const KEY_RELEASED: i32 = 0;

/// One knob event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnobInput {
    Up,
    Down,
    Confirm,
    Back,
}

/// Parse a stdin command line
pub fn parse_line(line: &str) -> Option<KnobInput> {
    match line.trim().to_ascii_lowercase().as_str() {
        "+" | "u" | "up" => Some(KnobInput::Up),
        "-" | "d" | "down" => Some(KnobInput::Down),
        "" | "ok" => Some(KnobInput::Confirm),
        "q" | "back" => Some(KnobInput::Back),
        _ => None,
    }
}

/// Map a key to a knob event
pub fn map_key(key: Key) -> Option<KnobInput> {
    match key {
        Key::KEY_UP => Some(KnobInput::Up),
        Key::KEY_DOWN => Some(KnobInput::Down),
        Key::KEY_ENTER | Key::KEY_OK => Some(KnobInput::Confirm),
        Key::KEY_ESC | Key::KEY_BACK => Some(KnobInput::Back),
        _ => None,
    }
}

/// Map a dial rotation to a knob event
fn map_dial(value: i32) -> Option<KnobInput> {
    match value.signum() {
        1 => Some(KnobInput::Up),
        -1 => Some(KnobInput::Down),
        _ => None,
    }
}

/// Map a raw evdev event to a knob event
fn map_event(event: &evdev::InputEvent) -> Option<KnobInput> {
    match event.kind() {
        InputEventKind::Key(key) if event.value() != KEY_RELEASED => map_key(key),
        InputEventKind::RelAxis(RelativeAxisType::REL_DIAL) => map_dial(event.value()),
        _ => None,
    }
}

/// Whether an input device looks like a keypad or rotary encoder
fn is_knob_device(device: &Device) -> bool {
    let has_keys = device.supported_keys().map_or(false, |keys| {
        keys.contains(Key::KEY_UP) && keys.contains(Key::KEY_DOWN)
    });
    let has_dial = device
        .supported_relative_axes()
        .map_or(false, |axes| axes.contains(RelativeAxisType::REL_DIAL));

    has_keys || has_dial
}

/// Keypad or rotary encoder handle
pub struct Keypad {
    device: Device,
    device_path: String,
}

impl std::fmt::Debug for Keypad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypad")
            .field("device_path", &self.device_path)
            .field("name", &self.device.name())
            .finish_non_exhaustive()
    }
}

impl Keypad {
    /// Open the keypad at `path`, or the first suitable `/dev/input/event*`
    /// device when `path` is `None`
    ///
    /// # Errors
    ///
    /// Returns `Input` error if no keypad is found or the device cannot be read
    pub fn open(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                let device = Device::open(path)
                    .map_err(|e| ShockError::Input(format!("Failed to open {}: {}", path, e)))?;
                info!("Using input device at: {}", path);
                Ok(Self {
                    device,
                    device_path: path.to_string(),
                })
            }
            None => Self::detect(),
        }
    }

    fn detect() -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| ShockError::Input(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ShockError::Input(format!("Failed to read directory entry: {}", e)))?;

        // Deterministic choice when several keypads are connected
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();
            if !path
                .file_name()
                .map_or(false, |name| name.to_string_lossy().starts_with("event"))
            {
                continue;
            }

            match Device::open(&path) {
                Ok(device) if is_knob_device(&device) => {
                    let device_path = path.to_string_lossy().to_string();
                    info!(
                        "Found keypad {} at: {}",
                        device.name().unwrap_or("(unnamed)"),
                        device_path
                    );
                    return Ok(Self {
                        device,
                        device_path,
                    });
                }
                Ok(_) => debug!("Skipping {}: no knob keys", path.display()),
                Err(e) => debug!("Could not open {}: {}", path.display(), e),
            }
        }

        Err(ShockError::Input(
            "No keypad or rotary encoder found in /dev/input".to_string(),
        ))
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Block until the device produces events; returns the knob events among them
    ///
    /// # Errors
    ///
    /// Returns `Input` error if the device disappears
    pub fn next_inputs(&mut self) -> Result<Vec<KnobInput>> {
        let events = self
            .device
            .fetch_events()
            .map_err(|e| ShockError::Input(format!("Failed to fetch events: {}", e)))?;

        Ok(events.filter_map(|event| map_event(&event)).collect())
    }
}

/// Read commands line by line from `reader` on a dedicated thread
///
/// The channel closes at end of input.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<KnobInput>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);

    thread::spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            };

            match parse_line(&line) {
                Some(input) => {
                    if tx.blocking_send(input).is_err() {
                        break;
                    }
                }
                None => warn!("Unknown command: {:?} (use +, -, enter, q)", line.trim()),
            }
        }
        debug!("Line input closed");
    });

    rx
}

/// Forward keypad events on a dedicated thread
///
/// The channel closes if the device goes away.
pub fn spawn_keypad_reader(mut keypad: Keypad) -> mpsc::Receiver<KnobInput> {
    let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);

    thread::spawn(move || loop {
        let inputs = match keypad.next_inputs() {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!("Keypad {} closed: {}", keypad.device_path(), e);
                return;
            }
        };

        for input in inputs {
            if tx.blocking_send(input).is_err() {
                return;
            }
        }
    });

    rx
}

/// Start the configured input source
///
/// # Errors
///
/// Returns error if the evdev keypad cannot be opened or the source is unknown
pub fn spawn_input_source(config: &UiConfig) -> Result<mpsc::Receiver<KnobInput>> {
    match config.input.as_str() {
        "stdin" => Ok(spawn_line_reader(io::BufReader::new(io::stdin()))),
        "evdev" => {
            let path = (!config.device_path.is_empty()).then_some(config.device_path.as_str());
            Ok(spawn_keypad_reader(Keypad::open(path)?))
        }
        other => Err(ShockError::Input(format!("Unknown input source: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("+"), Some(KnobInput::Up));
        assert_eq!(parse_line("u"), Some(KnobInput::Up));
        assert_eq!(parse_line("UP\n"), Some(KnobInput::Up));
        assert_eq!(parse_line("-"), Some(KnobInput::Down));
        assert_eq!(parse_line(" d "), Some(KnobInput::Down));
        assert_eq!(parse_line("down"), Some(KnobInput::Down));
        assert_eq!(parse_line(""), Some(KnobInput::Confirm));
        assert_eq!(parse_line("ok"), Some(KnobInput::Confirm));
        assert_eq!(parse_line("q"), Some(KnobInput::Back));
        assert_eq!(parse_line("back"), Some(KnobInput::Back));
        assert_eq!(parse_line("fire"), None);
    }

    #[test]
    fn test_map_key() {
        assert_eq!(map_key(Key::KEY_UP), Some(KnobInput::Up));
        assert_eq!(map_key(Key::KEY_DOWN), Some(KnobInput::Down));
        assert_eq!(map_key(Key::KEY_ENTER), Some(KnobInput::Confirm));
        assert_eq!(map_key(Key::KEY_OK), Some(KnobInput::Confirm));
        assert_eq!(map_key(Key::KEY_ESC), Some(KnobInput::Back));
        assert_eq!(map_key(Key::KEY_BACK), Some(KnobInput::Back));
        assert_eq!(map_key(Key::KEY_A), None);
    }

    #[test]
    fn test_map_dial() {
        assert_eq!(map_dial(1), Some(KnobInput::Up));
        assert_eq!(map_dial(3), Some(KnobInput::Up));
        assert_eq!(map_dial(-1), Some(KnobInput::Down));
        assert_eq!(map_dial(0), None);
    }

    #[test]
    fn test_map_event_ignores_key_release() {
        let press = evdev::InputEvent::new(evdev::EventType::KEY, Key::KEY_UP.code(), 1);
        let release = evdev::InputEvent::new(evdev::EventType::KEY, Key::KEY_UP.code(), 0);
        let dial = evdev::InputEvent::new(
            evdev::EventType::RELATIVE,
            RelativeAxisType::REL_DIAL.0,
            -1,
        );

        assert_eq!(map_event(&press), Some(KnobInput::Up));
        assert_eq!(map_event(&release), None);
        assert_eq!(map_event(&dial), Some(KnobInput::Down));
    }

    #[test]
    fn test_line_reader_skips_unknown_and_closes() {
        let mut rx = spawn_line_reader(Cursor::new("+\nfire\n\nq\n"));

        let mut received = Vec::new();
        while let Some(input) = tokio_test::block_on(rx.recv()) {
            received.push(input);
        }

        assert_eq!(
            received,
            vec![KnobInput::Up, KnobInput::Confirm, KnobInput::Back]
        );
    }

    #[test]
    fn test_unknown_input_source() {
        let config = UiConfig {
            input: "gamepad".to_string(),
            ..UiConfig::default()
        };
        assert!(spawn_input_source(&config).is_err());
    }

    #[test]
    #[ignore] // Requires a keypad on /dev/input
    fn test_detect_keypad() {
        let keypad = Keypad::open(None).unwrap();
        assert!(keypad.device_path().starts_with("/dev/input/event"));
    }
}
