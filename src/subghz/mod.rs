//! # Sub-GHz Module
//!
//! Drives a sub-GHz radio through one transmission per request.
//!
//! This module handles:
//! - Acquiring a radio device by name (simulated or serial bridge)
//! - Turning the BinRAW descriptor into a level/duration waveform
//! - Running the transmission session lifecycle
//! - Holding charge suppression while the carrier is on

pub mod device;
pub mod power;
pub mod serial_bridge;
pub mod session;
pub mod simulated;
pub mod waveform;

use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::{Config, PowerConfig, RadioConfig};
use crate::error::{Result, ShockError};
use crate::shocker::encoder::encode_frame;
use crate::shocker::protocol::{Channel, Command, Mode};
use crate::telemetry::{RotationPolicy, TransmissionLog, TransmissionRecord};

use device::RadioDevice;
use power::{NoPowerControl, PowerControl, SysfsChargeControl};
use serial_bridge::{SerialBridgeRadio, SerialBridgeSettings, SERIAL_DEVICE_NAME};
use session::{run_session, SessionSettings, TransmitOutcome};
use simulated::{SimulatedRadio, SIMULATED_DEVICE_NAME};

/// Channel every transmission targets
pub const TRANSMIT_CHANNEL: Channel = Channel::Ch01;

/// Mode every transmission uses
pub const TRANSMIT_MODE: Mode = Mode::Shock;

/// Acquire a radio device by name
///
/// Opening has no hardware side effects; the session's `init` does the rest.
///
/// # Errors
///
/// Returns `DeviceNotFound` if no device is registered under the name
pub fn open_device(config: &RadioConfig) -> Result<Box<dyn RadioDevice>> {
    match config.device.as_str() {
        SIMULATED_DEVICE_NAME => Ok(Box::new(SimulatedRadio::new())),
        SERIAL_DEVICE_NAME => Ok(Box::new(SerialBridgeRadio::new(SerialBridgeSettings {
            port: config.serial_port.clone(),
            baud_rate: config.baud_rate,
            timeout: Duration::from_millis(config.serial_timeout_ms),
        }))),
        other => Err(ShockError::DeviceNotFound(other.to_string())),
    }
}

/// Power control for the configured charger, or none
pub fn open_power_control(config: &PowerConfig) -> Box<dyn PowerControl> {
    if config.charge_behaviour_path.is_empty() {
        Box::new(NoPowerControl)
    } else {
        Box::new(SysfsChargeControl::new(&config.charge_behaviour_path))
    }
}

impl SessionSettings {
    /// Session settings from the `[radio]` and `[transmit]` sections
    ///
    /// # Errors
    ///
    /// Returns error if the preset name is unknown
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            frequency_hz: config.radio.frequency_hz,
            preset: config.radio.preset()?,
            poll_interval: Duration::from_millis(config.transmit.poll_interval_ms),
            max_poll_iterations: match config.transmit.max_poll_iterations {
                0 => None,
                n => Some(n),
            },
        })
    }
}

/// Entry point the UI calls to send one command
pub struct Transmitter {
    device: Box<dyn RadioDevice>,
    power: Box<dyn PowerControl>,
    settings: SessionSettings,
    log: Option<TransmissionLog>,
}

impl std::fmt::Debug for Transmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transmitter")
            .field("device", &self.device.name())
            .field("settings", &self.settings)
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}

impl Transmitter {
    pub fn new(
        device: Box<dyn RadioDevice>,
        power: Box<dyn PowerControl>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            device,
            power,
            settings,
            log: None,
        }
    }

    /// Record every transmission to `log`
    pub fn with_log(mut self, log: TransmissionLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Build a transmitter from configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The radio device name is unknown
    /// - The preset name is unknown
    /// - The transmission log cannot be opened
    pub fn from_config(config: &Config) -> Result<Self> {
        let device = open_device(&config.radio)?;
        let power = open_power_control(&config.power);
        let settings = SessionSettings::from_config(config)?;

        info!(
            "Radio: {} at {} Hz ({})",
            device.name(),
            settings.frequency_hz,
            settings.preset
        );

        let transmitter = Self::new(device, power, settings);
        if config.telemetry.enabled {
            let log = TransmissionLog::open_with_rotation(
                &config.telemetry.log_path,
                RotationPolicy::from(&config.telemetry),
            )?;
            Ok(transmitter.with_log(log))
        } else {
            Ok(transmitter)
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Transmit `strength` once on the fixed channel and mode
    ///
    /// Blocks until the radio is released. Failures are logged and never
    /// returned to the caller.
    pub fn transmit(&mut self, strength: u8) {
        let command = Command::new(TRANSMIT_CHANNEL, TRANSMIT_MODE, strength);
        let result = run_session(
            self.device.as_mut(),
            self.power.as_mut(),
            &self.settings,
            &command,
        );

        match &result {
            Ok(TransmitOutcome::Completed { polls, actual_frequency_hz }) => {
                info!(
                    "Transmitted strength {} at {} Hz ({} polls)",
                    strength, actual_frequency_hz, polls
                );
            }
            Ok(TransmitOutcome::StartFailed) => {}
            Ok(TransmitOutcome::PollLimitReached { polls }) => {
                warn!("Transmission of strength {} unconfirmed after {} polls", strength, polls);
            }
            Err(e) => error!("Transmission of strength {} failed: {}", strength, e),
        }

        if let Some(log) = self.log.as_mut() {
            let frame = encode_frame(command.channel, command.mode, command.strength);
            let record = match &result {
                Ok(outcome) => TransmissionRecord::from_outcome(&command, &frame, outcome),
                Err(e) => TransmissionRecord::from_error(&command, &frame, e),
            };
            if let Err(e) = log.record(&record) {
                warn!("Failed to write transmission record: {}", e);
            }
        }
    }
}
