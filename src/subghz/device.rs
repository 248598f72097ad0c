//! Trait abstraction for sub-GHz radio devices to enable testing

use std::fmt;

use crate::error::Result;

use super::waveform::Waveform;

/// Frequency ranges the CC1101 synthesizer can tune, in Hz (inclusive)
pub const FREQUENCY_BANDS_HZ: [(u32, u32); 3] = [
    (300_000_000, 348_000_000),
    (387_000_000, 464_000_000),
    (779_000_000, 928_000_000),
];

/// Check whether a carrier frequency falls inside a supported band
pub fn is_frequency_supported(frequency_hz: u32) -> bool {
    FREQUENCY_BANDS_HZ
        .iter()
        .any(|&(low, high)| (low..=high).contains(&frequency_hz))
}

/// Modulation preset loaded before transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// OOK, 270 kHz receive bandwidth, async serial data
    Ook270Async,
    /// OOK, 650 kHz receive bandwidth, async serial data
    Ook650Async,
}

impl Preset {
    /// Parse a preset from its short name (`AM270`, `AM650`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "AM270" => Some(Preset::Ook270Async),
            "AM650" => Some(Preset::Ook650Async),
            _ => None,
        }
    }

    /// Short name used in configuration and on the serial bridge
    pub fn name(self) -> &'static str {
        match self {
            Preset::Ook270Async => "AM270",
            Preset::Ook650Async => "AM650",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sub-GHz radio device operations, in the order a session calls them
///
/// Setup calls are fallible. Teardown calls are not: implementations log
/// their own failures so teardown always runs to completion.
pub trait RadioDevice: Send {
    /// Device name used for lookup
    fn name(&self) -> &str;

    /// Initialize the radio subsystem
    fn init(&mut self) -> Result<()>;

    /// Begin a device session
    fn begin(&mut self) -> Result<()>;

    /// Reset the transceiver to a known state
    fn reset(&mut self) -> Result<()>;

    /// Load a modulation preset
    fn load_preset(&mut self, preset: Preset) -> Result<()>;

    /// Tune the carrier; returns the frequency actually set
    fn set_frequency(&mut self, frequency_hz: u32) -> Result<u32>;

    /// Start transmitting `waveform` in the background
    ///
    /// Returns `false` if transmission could not be started.
    fn start_async_tx(&mut self, waveform: Waveform) -> bool;

    /// Whether the background transmission has finished
    fn is_async_tx_complete(&mut self) -> bool;

    /// Stop the background transmission
    fn stop_async_tx(&mut self);

    /// Put the transceiver to sleep
    fn sleep(&mut self);

    /// End the device session
    fn end(&mut self);

    /// Deinitialize the radio subsystem
    fn deinit(&mut self);
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::error::ShockError;
    use crate::shocker::protocol::{FRAME_SIZE, FRAME_SYMBOL_COUNT, SYMBOL_TE_US};
    use std::sync::{Arc, Mutex};

    /// Shared, ordered record of calls across mocks
    pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

    pub fn new_call_log() -> CallLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    /// Bytes a waveform plays back, one bit per `te_us`, MSB first
    pub fn waveform_bytes(waveform: &Waveform, te_us: u32) -> Vec<u8> {
        let bits: Vec<bool> = waveform
            .iter()
            .flat_map(|item| std::iter::repeat(item.level).take((item.duration_us / te_us) as usize))
            .collect();

        bits.chunks(8)
            .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | bit as u8))
            .collect()
    }

    /// Frame carried by a BinRAW waveform
    ///
    /// Byte 0 is the preamble; the next 20 bytes are symbol pairs, each
    /// nibble `E` (1) or `8` (0).
    pub fn decode_frame(waveform: &Waveform) -> [u8; FRAME_SIZE] {
        let bytes = waveform_bytes(waveform, SYMBOL_TE_US);
        let mut frame = [0u8; FRAME_SIZE];

        let nibbles = bytes[1..=FRAME_SYMBOL_COUNT / 2]
            .iter()
            .flat_map(|&pair| [pair >> 4, pair & 0x0F]);
        for (bit, nibble) in nibbles.enumerate() {
            assert!(nibble == 0xE || nibble == 0x8, "invalid symbol nibble {:X}", nibble);
            if nibble == 0xE {
                frame[bit / 8] |= 0x80 >> (bit % 8);
            }
        }

        frame
    }

    /// Mock radio that records every call
    pub struct RecordingRadio {
        pub calls: CallLog,
        pub start_succeeds: bool,
        pub polls_until_complete: usize,
        pub fail_on: Option<&'static str>,
        pub frequency_offset_hz: i32,
        pub waveform: Arc<Mutex<Option<Waveform>>>,
        polls: usize,
    }

    impl RecordingRadio {
        pub fn new(calls: CallLog) -> Self {
            Self {
                calls,
                start_succeeds: true,
                polls_until_complete: 1,
                fail_on: None,
                frequency_offset_hz: 0,
                waveform: Arc::new(Mutex::new(None)),
                polls: 0,
            }
        }

        pub fn count(&self, call: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|&&c| c == call).count()
        }

        fn record(&mut self, call: &'static str) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.fail_on == Some(call) {
                return Err(ShockError::Radio(format!("Mock {} error", call)));
            }
            Ok(())
        }
    }

    impl RadioDevice for RecordingRadio {
        fn name(&self) -> &str {
            "recording"
        }

        fn init(&mut self) -> Result<()> {
            self.record("init")
        }

        fn begin(&mut self) -> Result<()> {
            self.record("begin")
        }

        fn reset(&mut self) -> Result<()> {
            self.record("reset")
        }

        fn load_preset(&mut self, _preset: Preset) -> Result<()> {
            self.record("load_preset")
        }

        fn set_frequency(&mut self, frequency_hz: u32) -> Result<u32> {
            self.record("set_frequency")?;
            Ok((frequency_hz as i64 + self.frequency_offset_hz as i64) as u32)
        }

        fn start_async_tx(&mut self, waveform: Waveform) -> bool {
            self.calls.lock().unwrap().push("start_async_tx");
            *self.waveform.lock().unwrap() = Some(waveform);
            self.start_succeeds
        }

        fn is_async_tx_complete(&mut self) -> bool {
            self.calls.lock().unwrap().push("is_async_tx_complete");
            self.polls += 1;
            self.polls >= self.polls_until_complete
        }

        fn stop_async_tx(&mut self) {
            self.calls.lock().unwrap().push("stop_async_tx");
        }

        fn sleep(&mut self) {
            self.calls.lock().unwrap().push("sleep");
        }

        fn end(&mut self) {
            self.calls.lock().unwrap().push("end");
        }

        fn deinit(&mut self) {
            self.calls.lock().unwrap().push("deinit");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_frequency_supported() {
        assert!(is_frequency_supported(433_950_000));
        assert!(is_frequency_supported(315_000_000));
        assert!(is_frequency_supported(868_350_000));
    }

    #[test]
    fn test_out_of_band_frequencies() {
        assert!(!is_frequency_supported(0));
        assert!(!is_frequency_supported(350_000_000));
        assert!(!is_frequency_supported(2_400_000_000));
    }

    #[test]
    fn test_band_edges_inclusive() {
        for &(low, high) in &FREQUENCY_BANDS_HZ {
            assert!(is_frequency_supported(low));
            assert!(is_frequency_supported(high));
        }
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(Preset::from_name("AM270"), Some(Preset::Ook270Async));
        assert_eq!(Preset::from_name("AM650"), Some(Preset::Ook650Async));
        assert_eq!(Preset::from_name("FM238"), None);
        assert_eq!(Preset::Ook270Async.to_string(), "AM270");
    }
}
