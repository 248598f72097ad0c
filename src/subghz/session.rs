//! # Transmission Session
//!
//! One acquire-to-release cycle of the radio for a single transmission:
//!
//! ```text
//! Idle -> Acquired -> Configured -> Transmitting -> Polling -> Stopped -> Released
//!                                        |                        ^
//!                                        +---- start failed ------+
//! ```
//!
//! Every stage consumes the session and hands it on. Teardown lives in one
//! place (`release`, also run from `Drop`), so an error at any stage still
//! releases exactly what was acquired.

use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{Result, ShockError};
use crate::shocker::descriptor::build_descriptor;
use crate::shocker::encoder::encode_command;
use crate::shocker::protocol::{Command, PROTOCOL_BINRAW};

use super::device::{Preset, RadioDevice};
use super::power::{ChargeSuppression, PowerControl};
use super::waveform::{ProtocolEnvironment, RawTransmitter, PROTOCOL_REGISTRY};

/// Carrier frequency the collar listens on (433.95 MHz)
pub const DEFAULT_FREQUENCY_HZ: u32 = 433_950_000;

/// Delay between completion checks
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Session parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Requested carrier frequency in Hz
    pub frequency_hz: u32,

    /// Modulation preset
    pub preset: Preset,

    /// Delay between completion checks
    pub poll_interval: Duration,

    /// Upper bound on completion checks; `None` polls until the device
    /// reports completion, however long that takes
    pub max_poll_iterations: Option<u32>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            preset: Preset::Ook270Async,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_poll_iterations: None,
        }
    }
}

/// Lifecycle stage of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Acquired,
    Configured,
    Transmitting,
    Polling,
    Stopped,
    Released,
}

/// How a session that got as far as transmitting ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitOutcome {
    /// Device reported completion
    Completed { polls: u32, actual_frequency_hz: u32 },

    /// Device refused to start; nothing was transmitted
    StartFailed,

    /// Poll bound reached before the device reported completion
    PollLimitReached { polls: u32 },
}

/// Resources held for one transmission
pub struct TransmitSession<'a> {
    device: &'a mut dyn RadioDevice,
    power: &'a mut dyn PowerControl,
    settings: &'a SessionSettings,
    state: SessionState,
    initialized: bool,
    begun: bool,
    environment: Option<ProtocolEnvironment>,
    transmitter: Option<RawTransmitter>,
    actual_frequency_hz: u32,
}

impl<'a> TransmitSession<'a> {
    /// `Idle -> Acquired`: init the radio, set up the BinRAW transmitter and
    /// load the encoded command into it
    ///
    /// # Errors
    ///
    /// Returns error if the radio fails to initialize or the descriptor
    /// cannot be loaded. Anything already acquired is released.
    pub fn acquire(
        device: &'a mut dyn RadioDevice,
        power: &'a mut dyn PowerControl,
        settings: &'a SessionSettings,
        command: &Command,
    ) -> Result<Self> {
        let mut session = Self {
            device,
            power,
            settings,
            state: SessionState::Idle,
            initialized: false,
            begun: false,
            environment: None,
            transmitter: None,
            actual_frequency_hz: settings.frequency_hz,
        };

        session.device.init()?;
        session.initialized = true;

        let environment = ProtocolEnvironment::new(&PROTOCOL_REGISTRY);
        let mut transmitter = environment.transmitter(PROTOCOL_BINRAW)?;

        let (frame, symbols) = encode_command(command);
        let descriptor = build_descriptor(&symbols);
        transmitter.deserialize(&descriptor.to_string())?;
        debug!(
            "Loaded {} {} strength {} (frame {}) into {} transmitter",
            command.channel,
            command.mode,
            command.strength,
            frame,
            transmitter.protocol()
        );

        session.environment = Some(environment);
        session.transmitter = Some(transmitter);
        session.state = SessionState::Acquired;
        Ok(session)
    }

    /// `Acquired -> Configured`: begin, reset, load preset, tune
    ///
    /// The device may snap to the nearest frequency it can synthesize; the
    /// returned value is logged and kept, not re-validated.
    pub fn configure(mut self) -> Result<Self> {
        self.device.begin()?;
        self.begun = true;

        self.device.reset()?;
        self.device.load_preset(self.settings.preset)?;
        self.actual_frequency_hz = self.device.set_frequency(self.settings.frequency_hz)?;

        info!(
            "{} configured: preset {}, frequency {} Hz (requested {} Hz)",
            self.device.name(),
            self.settings.preset,
            self.actual_frequency_hz,
            self.settings.frequency_hz
        );

        self.state = SessionState::Configured;
        Ok(self)
    }

    /// `Configured -> ... -> Released`: transmit once and tear down
    ///
    /// A start failure is logged and reported as
    /// [`TransmitOutcome::StartFailed`]; it is not an `Err`.
    pub fn transmit(mut self) -> Result<TransmitOutcome> {
        if self.state != SessionState::Configured {
            return Err(ShockError::Radio(format!(
                "Cannot transmit from state {:?}",
                self.state
            )));
        }

        let waveform = match &self.transmitter {
            Some(transmitter) => transmitter.waveform()?,
            None => return Err(ShockError::Radio("No transmitter loaded".to_string())),
        };
        debug!(
            "Waveform: {} runs, {} us",
            waveform.len(),
            waveform.total_duration_us()
        );

        let outcome = {
            let _hold = ChargeSuppression::enter(&mut *self.power);
            self.state = SessionState::Transmitting;

            if self.device.start_async_tx(waveform) {
                self.state = SessionState::Polling;
                let polls = poll_until_complete(&mut *self.device, self.settings);
                self.device.stop_async_tx();
                self.state = SessionState::Stopped;

                match polls {
                    Ok(polls) => TransmitOutcome::Completed {
                        polls,
                        actual_frequency_hz: self.actual_frequency_hz,
                    },
                    Err(polls) => {
                        warn!("Transmission did not report completion after {} checks", polls);
                        TransmitOutcome::PollLimitReached { polls }
                    }
                }
            } else {
                error!("Failed to start async transmission.");
                self.state = SessionState::Stopped;
                TransmitOutcome::StartFailed
            }
        };

        self.release();
        Ok(outcome)
    }

    /// Current lifecycle stage
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Frequency reported by the device (requested frequency until configured)
    pub fn actual_frequency_hz(&self) -> u32 {
        self.actual_frequency_hz
    }

    /// Release everything still held; safe to call more than once
    fn release(&mut self) {
        if self.state == SessionState::Released {
            return;
        }

        if self.begun {
            self.device.sleep();
            self.device.end();
            self.begun = false;
        }

        if self.initialized {
            self.device.deinit();
            self.initialized = false;
        }

        self.transmitter = None;
        self.environment = None;
        self.state = SessionState::Released;
        debug!("Radio released");
    }
}

impl Drop for TransmitSession<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Poll the completion flag with a fixed delay between checks
///
/// Returns `Ok(checks)` on completion, `Err(checks)` if the configured bound
/// ran out first. Without a bound this blocks until the device completes.
fn poll_until_complete(
    device: &mut dyn RadioDevice,
    settings: &SessionSettings,
) -> std::result::Result<u32, u32> {
    let mut polls: u32 = 0;

    loop {
        polls = polls.saturating_add(1);
        if device.is_async_tx_complete() {
            return Ok(polls);
        }

        if let Some(max) = settings.max_poll_iterations {
            if polls >= max {
                return Err(polls);
            }
        }

        thread::sleep(settings.poll_interval);
    }
}

/// Run a full session for `command`
///
/// # Errors
///
/// Returns error if setup fails before transmission starts. Resources are
/// released on every path.
///
/// # Examples
///
/// ```no_run
/// use shock_remote::shocker::protocol::{Channel, Command, Mode};
/// use shock_remote::subghz::power::NoPowerControl;
/// use shock_remote::subghz::session::{run_session, SessionSettings};
/// use shock_remote::subghz::simulated::SimulatedRadio;
///
/// let mut radio = SimulatedRadio::new();
/// let mut power = NoPowerControl;
/// let settings = SessionSettings::default();
/// let command = Command::new(Channel::Ch01, Mode::Shock, 10);
///
/// let outcome = run_session(&mut radio, &mut power, &settings, &command)?;
/// println!("{:?}", outcome);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn run_session(
    device: &mut dyn RadioDevice,
    power: &mut dyn PowerControl,
    settings: &SessionSettings,
    command: &Command,
) -> Result<TransmitOutcome> {
    TransmitSession::acquire(device, power, settings, command)?
        .configure()?
        .transmit()
}
