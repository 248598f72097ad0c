//! # Serial Transceiver Bridge
//!
//! Drives a CC1101 attached to a microcontroller that speaks a line protocol
//! over USB serial. Every command is one `\n`-terminated line and is answered
//! with one line:
//!
//! | Command | Reply |
//! |---|---|
//! | `BEGIN` | `OK` |
//! | `RESET` | `OK` |
//! | `PRESET AM270` | `OK` |
//! | `FREQ 433950000` | `FREQ <actual>` |
//! | `TX 1500 -500 750 ...` | `OK`, later `DONE` when playback ends |
//! | `STOP` / `SLEEP` / `END` | `OK` |
//!
//! `TX` durations are microseconds, positive for carrier on and negative for
//! carrier off. Any reply starting with `ERR` is a failure.

use std::io::{self, Read, Write};
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tracing::{debug, error, info, warn};

use crate::error::{Result, ShockError};

use super::device::{Preset, RadioDevice};
use super::waveform::Waveform;

/// Registry name of the serial bridge device
pub const SERIAL_DEVICE_NAME: &str = "serial";

/// Reads attempted (each bounded by the port timeout) before a reply is late
const REPLY_ATTEMPTS: u32 = 20;

/// Longest partial line kept while waiting for a newline
const MAX_PENDING_BYTES: usize = 4096;

/// Completion notice sent after `TX` playback ends
const DONE_LINE: &str = "DONE";

/// Line-oriented command link over any byte stream
pub struct BridgeLink<T> {
    stream: T,
    pending: Vec<u8>,
}

impl<T: Read + Write> BridgeLink<T> {
    pub fn new(stream: T) -> Self {
        Self {
            stream,
            pending: Vec::new(),
        }
    }

    /// Send one command line
    ///
    /// Complete lines still buffered from earlier replies are dropped first,
    /// so the next reply read belongs to this command.
    pub fn send(&mut self, line: &str) -> Result<()> {
        while let Some(stale) = self.take_line() {
            debug!("Discarding stale bridge line: {}", stale);
        }

        let mut buf = BytesMut::with_capacity(line.len() + 1);
        buf.put_slice(line.as_bytes());
        buf.put_u8(b'\n');

        self.stream
            .write_all(&buf)
            .map_err(|e| ShockError::Radio(format!("Failed to write to serial bridge: {}", e)))?;
        self.stream
            .flush()
            .map_err(|e| ShockError::Radio(format!("Failed to flush serial bridge: {}", e)))?;

        debug!("Bridge <- {}", command_word(line));
        Ok(())
    }

    /// Read one reply line if one arrives within a single read
    ///
    /// Returns `Ok(None)` when the read times out without a full line.
    pub fn try_read_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }

        let mut chunk = [0u8; 64];
        match self.stream.read(&mut chunk) {
            Ok(0) => Err(ShockError::Radio(
                "Serial bridge closed the connection".to_string(),
            )),
            Ok(n) => {
                self.pending.extend_from_slice(&chunk[..n]);
                let line = self.take_line();
                if line.is_none() && self.pending.len() > MAX_PENDING_BYTES {
                    self.pending.clear();
                    return Err(ShockError::Radio(format!(
                        "Serial bridge sent more than {} bytes without a newline",
                        MAX_PENDING_BYTES
                    )));
                }
                Ok(line)
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Ok(None)
            }
            Err(e) => Err(ShockError::Radio(format!(
                "Failed to read from serial bridge: {}",
                e
            ))),
        }
    }

    /// Send a command and wait for its reply
    pub fn request(&mut self, line: &str) -> Result<String> {
        self.send(line)?;

        for _ in 0..REPLY_ATTEMPTS {
            match self.try_read_line()? {
                Some(reply) if reply.is_empty() => continue,
                // Late completion of an earlier TX
                Some(reply) if reply == DONE_LINE => {
                    debug!("Ignoring late {} while waiting for {}", DONE_LINE, command_word(line));
                    continue;
                }
                Some(reply) if reply.starts_with("ERR") => {
                    return Err(ShockError::Radio(format!(
                        "{} rejected by bridge: {}",
                        command_word(line),
                        reply
                    )));
                }
                Some(reply) => {
                    debug!("Bridge -> {}", reply);
                    return Ok(reply);
                }
                None => continue,
            }
        }

        Err(ShockError::Radio(format!(
            "No reply from bridge to {}",
            command_word(line)
        )))
    }

    /// Send a command that must be answered with `OK`
    pub fn expect_ok(&mut self, line: &str) -> Result<()> {
        let reply = self.request(line)?;
        if reply != "OK" {
            return Err(ShockError::Radio(format!(
                "Unexpected reply to {}: {}",
                command_word(line),
                reply
            )));
        }
        Ok(())
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }
}

/// First word of a command, for logs and errors (TX lines are long)
fn command_word(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or("")
}

/// Format a waveform as a `TX` command line
pub fn format_tx_line(waveform: &Waveform) -> String {
    let mut line = String::from("TX");
    for item in waveform.iter() {
        let duration = item.duration_us as i64;
        let signed = if item.level { duration } else { -duration };
        line.push(' ');
        line.push_str(&signed.to_string());
    }
    line
}

/// Parse a `FREQ <hz>` reply
pub fn parse_frequency_reply(reply: &str) -> Result<u32> {
    reply
        .strip_prefix("FREQ ")
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| ShockError::Radio(format!("Invalid frequency reply: {}", reply)))
}

/// Serial port settings for the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialBridgeSettings {
    /// Device path (e.g., /dev/ttyACM0)
    pub port: String,

    /// Baud rate
    pub baud_rate: u32,

    /// Per-read timeout
    pub timeout: Duration,
}

/// Radio device backed by a serial transceiver bridge
pub struct SerialBridgeRadio {
    settings: SerialBridgeSettings,
    link: Option<BridgeLink<Box<dyn tokio_serial::SerialPort>>>,
}

impl std::fmt::Debug for SerialBridgeRadio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialBridgeRadio")
            .field("settings", &self.settings)
            .field("connected", &self.link.is_some())
            .finish_non_exhaustive()
    }
}

impl SerialBridgeRadio {
    pub fn new(settings: SerialBridgeSettings) -> Self {
        Self {
            settings,
            link: None,
        }
    }

    /// Device path of the bridge
    pub fn port(&self) -> &str {
        &self.settings.port
    }

    /// Open the serial port, 8N1, no flow control
    fn open_port(&self) -> Result<Box<dyn tokio_serial::SerialPort>> {
        tokio_serial::new(&self.settings.port, self.settings.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(self.settings.timeout)
            .open()
            .map_err(|e| {
                ShockError::Radio(format!("Failed to open {}: {}", self.settings.port, e))
            })
    }

    fn link(&mut self) -> Result<&mut BridgeLink<Box<dyn tokio_serial::SerialPort>>> {
        self.link
            .as_mut()
            .ok_or_else(|| ShockError::Radio("Serial bridge not initialized".to_string()))
    }

    /// Teardown command: failures are logged, not returned
    fn send_teardown(&mut self, command: &str) {
        let result = self.link().and_then(|link| link.expect_ok(command));
        if let Err(e) = result {
            warn!("Bridge {} failed: {}", command, e);
        }
    }
}

impl RadioDevice for SerialBridgeRadio {
    fn name(&self) -> &str {
        SERIAL_DEVICE_NAME
    }

    fn init(&mut self) -> Result<()> {
        if self.link.is_some() {
            return Err(ShockError::Radio("Serial bridge already initialized".to_string()));
        }

        let port = self.open_port()?;
        self.link = Some(BridgeLink::new(port));
        info!("Opened serial bridge at {}", self.settings.port);
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.link()?.expect_ok("BEGIN")
    }

    fn reset(&mut self) -> Result<()> {
        self.link()?.expect_ok("RESET")
    }

    fn load_preset(&mut self, preset: Preset) -> Result<()> {
        self.link()?.expect_ok(&format!("PRESET {}", preset.name()))
    }

    fn set_frequency(&mut self, frequency_hz: u32) -> Result<u32> {
        let reply = self.link()?.request(&format!("FREQ {}", frequency_hz))?;
        parse_frequency_reply(&reply)
    }

    fn start_async_tx(&mut self, waveform: Waveform) -> bool {
        let line = format_tx_line(&waveform);
        match self.link().and_then(|link| link.expect_ok(&line)) {
            Ok(()) => true,
            Err(e) => {
                warn!("Bridge refused TX: {}", e);
                false
            }
        }
    }

    fn is_async_tx_complete(&mut self) -> bool {
        let line = match self.link() {
            Ok(link) => link.try_read_line(),
            Err(e) => Err(e),
        };

        match line {
            Ok(Some(line)) if line == DONE_LINE => true,
            Ok(Some(line)) => {
                debug!("Ignoring bridge line while transmitting: {}", line);
                false
            }
            Ok(None) => false,
            Err(e) => {
                // Nothing more can be observed from a dead link
                error!("Lost serial bridge during transmission: {}", e);
                true
            }
        }
    }

    fn stop_async_tx(&mut self) {
        self.send_teardown("STOP");
    }

    fn sleep(&mut self) {
        self.send_teardown("SLEEP");
    }

    fn end(&mut self) {
        self.send_teardown("END");
    }

    fn deinit(&mut self) {
        if self.link.take().is_some() {
            info!("Closed serial bridge at {}", self.settings.port);
        }
    }
}
