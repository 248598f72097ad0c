//! # Shocker Protocol Constants and Types
//!
//! Core definitions for the collar remote command frame and the BinRAW
//! descriptor that carries it to the radio.

use std::fmt;

/// Transmitter identifier the collar is paired with
pub const TRANSMITTER_ID: u16 = 0xDDC8;

/// Encoded frame size: id(2) + channel/mode(1) + strength(1) + checksum(1)
pub const FRAME_SIZE: usize = 5;

/// Number of symbols produced from one frame (one per bit)
pub const FRAME_SYMBOL_COUNT: usize = FRAME_SIZE * 8;

/// Symbol emitted for a `1` bit (nibble 0b1110: long pulse)
pub const SYMBOL_ONE: char = 'E';

/// Symbol emitted for a `0` bit (nibble 0b1000: short pulse)
pub const SYMBOL_ZERO: char = '8';

/// Length of the paired symbol text: 20 pairs separated by 19 spaces
pub const SYMBOL_STREAM_LEN: usize = FRAME_SYMBOL_COUNT + FRAME_SYMBOL_COUNT / 2 - 1;

/// Protocol name understood by the raw transmitter
pub const PROTOCOL_BINRAW: &str = "BinRAW";

/// Symbol unit duration in microseconds
pub const SYMBOL_TE_US: u32 = 250;

/// Total bit count of `Data_RAW` (preamble + frame symbols + postamble)
pub const RAW_BIT_COUNT: u16 = 256;

/// Raw bytes sent before the frame symbols
pub const RAW_PREAMBLE: &[u8] = &[0xFC];

/// Raw bytes sent after the frame symbols
pub const RAW_POSTAMBLE: &[u8] = &[0x88, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

/// Collar channel selector (upper nibble of byte 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    Ch01 = 0,
    Ch02 = 1,
    Ch03 = 2,
}

impl Channel {
    /// All channels, in ordinal order
    pub const ALL: [Channel; 3] = [Channel::Ch01, Channel::Ch02, Channel::Ch03];

    /// Ordinal value packed into the frame
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{:02}", self.ordinal() + 1)
    }
}

/// Collar operating mode (lower nibble of byte 2)
///
/// Ordinals start at 1; 0 is not a valid mode on the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mode {
    Shock = 1,
    Vibrate = 2,
    Beep = 3,
}

impl Mode {
    /// All modes, in ordinal order
    pub const ALL: [Mode; 3] = [Mode::Shock, Mode::Vibrate, Mode::Beep];

    /// Ordinal value packed into the frame
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Shock => "shock",
            Mode::Vibrate => "vibrate",
            Mode::Beep => "beep",
        };
        f.write_str(name)
    }
}

/// Logical request to transmit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Target channel
    pub channel: Channel,

    /// Operating mode
    pub mode: Mode,

    /// Intensity (0-99 meaningful, written to the frame as-is)
    pub strength: u8,
}

impl Command {
    /// Create a new command
    pub fn new(channel: Channel, mode: Mode, strength: u8) -> Self {
        Self {
            channel,
            mode,
            strength,
        }
    }
}
