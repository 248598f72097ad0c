//! # Shocker Frame Encoder
//!
//! Encodes a command into the 5-byte frame and its paired symbol text.

use std::fmt;

use tracing::debug;

use super::checksum::sum8;
use super::protocol::*;

/// Encoded 5-byte command frame
///
/// ```text
/// Byte 0: transmitter id, high byte (0xDD)
/// Byte 1: transmitter id, low byte  (0xC8)
/// Byte 2: channel << 4 | mode
/// Byte 3: strength
/// Byte 4: (byte0 + byte1 + byte2 + byte3) mod 256
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame([u8; FRAME_SIZE]);

impl Frame {
    /// Raw frame bytes
    pub fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.0
    }

    /// Channel ordinal stored in the upper nibble of byte 2
    pub fn channel_ordinal(&self) -> u8 {
        self.0[2] >> 4
    }

    /// Mode ordinal stored in the lower nibble of byte 2
    pub fn mode_ordinal(&self) -> u8 {
        self.0[2] & 0x0F
    }

    /// Strength byte
    pub fn strength(&self) -> u8 {
        self.0[3]
    }

    /// Checksum byte
    pub fn checksum(&self) -> u8 {
        self.0[4]
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Paired `E`/`8` symbol text for one frame
///
/// Always [`SYMBOL_STREAM_LEN`] characters: 20 two-symbol tokens separated by
/// single spaces. The receiver decodes fixed-width tokens, so the layout must
/// not change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolStream(String);

impl SymbolStream {
    /// Symbol text including separators
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Symbols without separators, MSB of byte 0 first
    pub fn symbols(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars().filter(|&c| c != ' ')
    }
}

impl fmt::Display for SymbolStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode a command into its frame and symbol stream
///
/// Total over the input domain: strength is written as-is, no clamping.
///
/// # Examples
///
/// ```
/// use shock_remote::shocker::encoder::encode;
/// use shock_remote::shocker::protocol::{Channel, Mode};
///
/// let (frame, symbols) = encode(Channel::Ch01, Mode::Shock, 10);
/// assert_eq!(frame.to_string(), "DD C8 01 0A B0");
/// assert_eq!(symbols.as_str().len(), 59);
/// ```
pub fn encode(channel: Channel, mode: Mode, strength: u8) -> (Frame, SymbolStream) {
    let frame = encode_frame(channel, mode, strength);
    let symbols = encode_symbols(&frame);

    debug!("Payload: {}", frame);

    (frame, symbols)
}

/// Encode a [`Command`] into its frame and symbol stream
pub fn encode_command(command: &Command) -> (Frame, SymbolStream) {
    encode(command.channel, command.mode, command.strength)
}

/// Build the 5-byte frame
pub fn encode_frame(channel: Channel, mode: Mode, strength: u8) -> Frame {
    let [id_high, id_low] = TRANSMITTER_ID.to_be_bytes();

    let mut bytes = [0u8; FRAME_SIZE];
    bytes[0] = id_high;
    bytes[1] = id_low;
    bytes[2] = (channel.ordinal() & 0x0F) << 4 | (mode.ordinal() & 0x0F);
    bytes[3] = strength;
    bytes[4] = sum8(&bytes[..4]);

    Frame(bytes)
}

/// Expand a frame into paired symbols, MSB first
///
/// ```text
/// bit:     1  1  0  1  1  1  0  1 ...
/// symbol:  E  E  8  E  E  E  8  E ...
/// text:   "EE 8E EE 8E ..."
/// ```
pub fn encode_symbols(frame: &Frame) -> SymbolStream {
    let mut text = String::with_capacity(SYMBOL_STREAM_LEN);

    for i in 0..FRAME_SYMBOL_COUNT {
        if i > 0 && i % 2 == 0 {
            text.push(' ');
        }

        let byte = frame.0[i / 8];
        let bit = (byte >> (7 - i % 8)) & 1;
        text.push(if bit == 1 { SYMBOL_ONE } else { SYMBOL_ZERO });
    }

    SymbolStream(text)
}
