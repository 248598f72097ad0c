//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{Result, ShockError};
use crate::subghz::device::{is_frequency_supported, Preset};
use crate::subghz::serial_bridge::SERIAL_DEVICE_NAME;
use crate::subghz::simulated::SIMULATED_DEVICE_NAME;
use crate::ui::knob::KNOB_MAX;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub radio: RadioConfig,
    #[serde(default)]
    pub transmit: TransmitConfig,
    #[serde(default)]
    pub power: PowerConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Radio device configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RadioConfig {
    #[serde(default = "default_device")]
    pub device: String,

    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: u32,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_serial_port")]
    pub serial_port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_serial_timeout_ms")]
    pub serial_timeout_ms: u64,
}

/// Transmission session configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TransmitConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// 0 = poll until the device reports completion
    #[serde(default)]
    pub max_poll_iterations: u32,
}

/// Charge suppression configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PowerConfig {
    /// sysfs `charge_behaviour` file; empty disables charge suppression
    #[serde(default)]
    pub charge_behaviour_path: String,
}

/// Knob UI configuration
#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    #[serde(default = "default_input")]
    pub input: String,

    /// evdev device path; empty = auto-detect
    #[serde(default)]
    pub device_path: String,

    #[serde(default = "default_initial_strength")]
    pub initial_strength: u8,

    #[serde(default)]
    pub initial_repeat: u8,
}

/// Transmission log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub log_path: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    /// Rotated files kept alongside the active one
    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Tracing configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files; empty = stderr only
    #[serde(default)]
    pub log_dir: String,
}

/// Baud rates the bridge firmware supports
const VALID_BAUD_RATES: [u32; 4] = [9600, 57600, 115200, 921600];

/// Knob input sources
const VALID_INPUTS: [&str; 2] = ["stdin", "evdev"];

// Default value functions
fn default_device() -> String { SIMULATED_DEVICE_NAME.to_string() }
fn default_frequency_hz() -> u32 { 433_950_000 }
fn default_preset() -> String { "AM270".to_string() }
fn default_serial_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_serial_timeout_ms() -> u64 { 50 }

fn default_poll_interval_ms() -> u64 { 100 }

fn default_input() -> String { "stdin".to_string() }
fn default_initial_strength() -> u8 { 10 }

fn default_log_path() -> String { "./logs/transmissions.jsonl".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

fn default_log_level() -> String { "info".to_string() }

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            frequency_hz: default_frequency_hz(),
            preset: default_preset(),
            serial_port: default_serial_port(),
            baud_rate: default_baud_rate(),
            serial_timeout_ms: default_serial_timeout_ms(),
        }
    }
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_iterations: 0,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            device_path: String::new(),
            initial_strength: default_initial_strength(),
            initial_repeat: 0,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: default_log_path(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

impl RadioConfig {
    /// Parsed modulation preset
    pub fn preset(&self) -> Result<Preset> {
        Preset::from_name(&self.preset).ok_or_else(|| invalid(format!(
            "preset must be one of: AM270, AM650 (got {})",
            self.preset
        )))
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use shock_remote::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Validate radio configuration
        if ![SIMULATED_DEVICE_NAME, SERIAL_DEVICE_NAME].contains(&self.radio.device.as_str()) {
            return Err(invalid(format!(
                "device must be one of: {}, {}",
                SIMULATED_DEVICE_NAME, SERIAL_DEVICE_NAME
            )));
        }

        if !is_frequency_supported(self.radio.frequency_hz) {
            return Err(invalid(
                "frequency_hz must be within 300-348, 387-464 or 779-928 MHz",
            ));
        }

        self.radio.preset()?;

        if self.radio.device == SERIAL_DEVICE_NAME && self.radio.serial_port.is_empty() {
            return Err(invalid("serial_port cannot be empty for the serial device"));
        }

        if !VALID_BAUD_RATES.contains(&self.radio.baud_rate) {
            return Err(invalid("baud_rate must be one of: 9600, 57600, 115200, 921600"));
        }

        if self.radio.serial_timeout_ms == 0 || self.radio.serial_timeout_ms > 10000 {
            return Err(invalid("serial_timeout_ms must be between 1 and 10000"));
        }

        // Validate transmit timing
        if self.transmit.poll_interval_ms == 0 || self.transmit.poll_interval_ms > 10000 {
            return Err(invalid("poll_interval_ms must be between 1 and 10000"));
        }

        // Validate knob configuration
        if !VALID_INPUTS.contains(&self.ui.input.as_str()) {
            return Err(invalid("input must be one of: stdin, evdev"));
        }

        if self.ui.initial_strength > KNOB_MAX {
            return Err(invalid(format!("initial_strength must be between 0 and {}", KNOB_MAX)));
        }

        if self.ui.initial_repeat > KNOB_MAX {
            return Err(invalid(format!("initial_repeat must be between 0 and {}", KNOB_MAX)));
        }

        // Validate telemetry configuration
        if self.telemetry.enabled && self.telemetry.log_path.is_empty() {
            return Err(invalid("telemetry log_path cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        // Validate log level
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(invalid(
                "log level must be one of: trace, debug, info, warn, error",
            ));
        }

        Ok(())
    }
}

fn invalid<T: std::fmt::Display>(msg: T) -> ShockError {
    ShockError::Config(toml::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.radio.preset().unwrap(), Preset::Ook270Async);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[radio]
device = "serial"
serial_port = "/dev/ttyUSB0"
frequency_hz = 433920000

[transmit]
max_poll_iterations = 50

[ui]
initial_strength = 25
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.radio.device, "serial");
        assert_eq!(config.radio.serial_port, "/dev/ttyUSB0");
        assert_eq!(config.radio.frequency_hz, 433_920_000);
        assert_eq!(config.transmit.max_poll_iterations, 50);
        assert_eq!(config.transmit.poll_interval_ms, 100);
        assert_eq!(config.ui.initial_strength, 25);
        assert!(!config.telemetry.enabled);
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        use tempfile::NamedTempFile;

        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.radio.device, "simulated");
        assert_eq!(config.radio.frequency_hz, 433_950_000);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/shock-remote.toml");
        assert!(matches!(result, Err(ShockError::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[radio\nfrequency_hz = ").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(ShockError::Config(_))));
    }

    #[test]
    fn test_unknown_device() {
        let mut config = Config::default();
        config.radio.device = "cc1101_ext".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frequency_out_of_band() {
        let mut config = Config::default();
        config.radio.frequency_hz = 350_000_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_other_bands_accepted() {
        for frequency in [315_000_000, 868_350_000, 915_000_000] {
            let mut config = Config::default();
            config.radio.frequency_hz = frequency;
            assert!(config.validate().is_ok(), "{} Hz should be valid", frequency);
        }
    }

    #[test]
    fn test_invalid_preset() {
        let mut config = Config::default();
        config.radio.preset = "FM476".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_serial_port_for_serial_device() {
        let mut config = Config::default();
        config.radio.device = "serial".to_string();
        config.radio.serial_port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_serial_port_for_simulated_device() {
        let mut config = Config::default();
        config.radio.serial_port = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.radio.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &VALID_BAUD_RATES {
            let mut config = Config::default();
            config.radio.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_serial_timeout_zero() {
        let mut config = Config::default();
        config.radio.serial_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_zero() {
        let mut config = Config::default();
        config.transmit.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_too_high() {
        let mut config = Config::default();
        config.transmit.poll_interval_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_input() {
        let mut config = Config::default();
        config.ui.input = "gamepad".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_initial_strength_too_high() {
        let mut config = Config::default();
        config.ui.initial_strength = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_initial_repeat_too_high() {
        let mut config = Config::default();
        config.ui.initial_repeat = 150;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_path_when_enabled() {
        let mut config = Config::default();
        config.telemetry.enabled = true;
        config.telemetry.log_path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_path_when_disabled() {
        let mut config = Config::default();
        config.telemetry.enabled = false;
        config.telemetry.log_path = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_max_records_per_file() {
        let mut config = Config::default();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_files_to_keep() {
        let mut config = Config::default();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_device(), "simulated");
        assert_eq!(default_frequency_hz(), 433_950_000);
        assert_eq!(default_preset(), "AM270");
        assert_eq!(default_serial_port(), "/dev/ttyACM0");
        assert_eq!(default_baud_rate(), 115200);
        assert_eq!(default_serial_timeout_ms(), 50);
        assert_eq!(default_poll_interval_ms(), 100);
        assert_eq!(default_input(), "stdin");
        assert_eq!(default_initial_strength(), 10);
        assert_eq!(default_log_path(), "./logs/transmissions.jsonl");
        assert_eq!(default_max_records_per_file(), 10000);
        assert_eq!(default_max_files_to_keep(), 10);
        assert_eq!(default_log_level(), "info");
    }
}
