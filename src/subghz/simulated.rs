//! # Simulated Radio
//!
//! A CC1101 stand-in that needs no hardware. Async transmission runs on a
//! background thread for the real waveform duration, and frequencies snap to
//! the synthesizer step the way the chip would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, ShockError};

use super::device::{is_frequency_supported, Preset, RadioDevice};
use super::waveform::Waveform;

/// Registry name of the simulated device
pub const SIMULATED_DEVICE_NAME: &str = "simulated";

/// CC1101 reference crystal in Hz
const CRYSTAL_HZ: u64 = 26_000_000;

/// Snap a frequency to the nearest value the synthesizer can produce
///
/// The CC1101 frequency word is `f * 2^16 / f_xosc`, so the step is
/// 26 MHz / 65536, about 396.7 Hz.
pub fn snap_frequency(frequency_hz: u32) -> u32 {
    let word = ((frequency_hz as u64) << 16) + CRYSTAL_HZ / 2;
    let word = word / CRYSTAL_HZ;
    ((word * CRYSTAL_HZ) >> 16) as u32
}

/// Background playback of one waveform
struct Playback {
    complete: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Simulated sub-GHz radio
pub struct SimulatedRadio {
    initialized: bool,
    active: bool,
    preset: Option<Preset>,
    frequency_hz: Option<u32>,
    realtime: bool,
    playback: Option<Playback>,
    last_waveform: Arc<Mutex<Option<Waveform>>>,
    transmissions: u32,
}

impl std::fmt::Debug for SimulatedRadio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedRadio")
            .field("initialized", &self.initialized)
            .field("active", &self.active)
            .field("preset", &self.preset)
            .field("frequency_hz", &self.frequency_hz)
            .field("transmissions", &self.transmissions)
            .finish_non_exhaustive()
    }
}

impl Default for SimulatedRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRadio {
    /// Create a simulated radio that takes as long as the real waveform
    pub fn new() -> Self {
        Self {
            initialized: false,
            active: false,
            preset: None,
            frequency_hz: None,
            realtime: true,
            playback: None,
            last_waveform: Arc::new(Mutex::new(None)),
            transmissions: 0,
        }
    }

    /// Complete transmissions immediately instead of in real time
    pub fn instant(mut self) -> Self {
        self.realtime = false;
        self
    }

    /// Handle to the most recently transmitted waveform
    pub fn last_waveform(&self) -> Arc<Mutex<Option<Waveform>>> {
        Arc::clone(&self.last_waveform)
    }

    /// Number of transmissions started
    pub fn transmissions(&self) -> u32 {
        self.transmissions
    }

    fn require_active(&self, operation: &str) -> Result<()> {
        if !self.active {
            return Err(ShockError::Radio(format!(
                "{} requires an active device session",
                operation
            )));
        }
        Ok(())
    }

    fn join_playback(&mut self) {
        if let Some(playback) = self.playback.take() {
            if playback.handle.join().is_err() {
                warn!("Simulated playback thread panicked");
            }
        }
    }
}

impl RadioDevice for SimulatedRadio {
    fn name(&self) -> &str {
        SIMULATED_DEVICE_NAME
    }

    fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Err(ShockError::Radio("Radio subsystem already initialized".to_string()));
        }
        self.initialized = true;
        debug!("Simulated radio subsystem initialized");
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(ShockError::Radio("Radio subsystem not initialized".to_string()));
        }
        self.active = true;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.require_active("reset")?;
        self.join_playback();
        self.preset = None;
        self.frequency_hz = None;
        Ok(())
    }

    fn load_preset(&mut self, preset: Preset) -> Result<()> {
        self.require_active("load_preset")?;
        self.preset = Some(preset);
        Ok(())
    }

    fn set_frequency(&mut self, frequency_hz: u32) -> Result<u32> {
        self.require_active("set_frequency")?;
        if !is_frequency_supported(frequency_hz) {
            return Err(ShockError::Radio(format!(
                "Frequency {} Hz is outside the supported bands",
                frequency_hz
            )));
        }

        let actual = snap_frequency(frequency_hz);
        self.frequency_hz = Some(actual);
        Ok(actual)
    }

    fn start_async_tx(&mut self, waveform: Waveform) -> bool {
        if !self.active || self.playback.is_some() {
            warn!("Simulated radio is not ready to transmit");
            return false;
        }
        let (Some(preset), Some(frequency_hz)) = (self.preset, self.frequency_hz) else {
            warn!("Simulated radio has no preset or frequency loaded");
            return false;
        };

        let duration = Duration::from_micros(waveform.total_duration_us());
        info!(
            "Simulated TX on {} Hz ({}): {} runs, {} ms",
            frequency_hz,
            preset,
            waveform.len(),
            duration.as_millis()
        );

        let complete = Arc::new(AtomicBool::new(false));
        let done = Arc::clone(&complete);
        let last_waveform = Arc::clone(&self.last_waveform);
        let realtime = self.realtime;

        let handle = thread::spawn(move || {
            if realtime {
                thread::sleep(duration);
            }
            if let Ok(mut last) = last_waveform.lock() {
                *last = Some(waveform);
            }
            done.store(true, Ordering::Release);
        });

        self.playback = Some(Playback { complete, handle });
        self.transmissions += 1;
        true
    }

    fn is_async_tx_complete(&mut self) -> bool {
        self.playback
            .as_ref()
            .map_or(true, |playback| playback.complete.load(Ordering::Acquire))
    }

    fn stop_async_tx(&mut self) {
        self.join_playback();
    }

    fn sleep(&mut self) {
        self.join_playback();
    }

    fn end(&mut self) {
        self.active = false;
    }

    fn deinit(&mut self) {
        self.join_playback();
        self.active = false;
        self.initialized = false;
        self.preset = None;
        self.frequency_hz = None;
        debug!("Simulated radio subsystem deinitialized");
    }
}
