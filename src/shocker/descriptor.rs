//! # BinRAW Descriptor
//!
//! The text descriptor the raw transmitter is loaded from:
//!
//! ```text
//! Protocol: BinRAW
//! Bit: 256
//! TE: 250
//! Bit_RAW: 256
//! Data_RAW: FC EE 8E EE 8E ... 88 00 00 00 00 00 00 00 00 00 00
//! ```
//!
//! Each `E`/`8` symbol pair of the frame is one `Data_RAW` byte, so the
//! descriptor is valid hex from end to end.

use std::fmt;
use std::str::FromStr;

use super::encoder::SymbolStream;
use super::protocol::*;
use crate::error::{Result, ShockError};

/// Parsed or generated BinRAW descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDescriptor {
    /// Protocol name (always `BinRAW` for generated descriptors)
    pub protocol: String,

    /// Nominal bit count
    pub bit: u16,

    /// Symbol unit duration in microseconds
    pub te_us: u32,

    /// Number of `data_raw` bits to transmit
    pub bit_raw: u16,

    /// Raw waveform bytes, MSB first
    pub data_raw: Vec<u8>,
}

impl RawDescriptor {
    /// Waveform bits in transmit order, truncated to `bit_raw`
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        self.data_raw
            .iter()
            .flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1 == 1))
            .take(self.bit_raw as usize)
    }

    fn validate(&self) -> Result<()> {
        if self.te_us == 0 {
            return Err(ShockError::Protocol("TE must be greater than 0".to_string()));
        }

        if self.te_us as u64 * self.bit_raw as u64 > u32::MAX as u64 {
            return Err(ShockError::Protocol(format!(
                "TE {} x Bit_RAW {} exceeds the longest playable waveform",
                self.te_us, self.bit_raw
            )));
        }

        let available = self.data_raw.len() * 8;
        if self.bit_raw as usize > available {
            return Err(ShockError::Protocol(format!(
                "Bit_RAW {} exceeds Data_RAW length ({} bits)",
                self.bit_raw, available
            )));
        }

        Ok(())
    }
}

impl fmt::Display for RawDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Protocol: {}", self.protocol)?;
        writeln!(f, "Bit: {}", self.bit)?;
        writeln!(f, "TE: {}", self.te_us)?;
        writeln!(f, "Bit_RAW: {}", self.bit_raw)?;
        f.write_str("Data_RAW:")?;
        for byte in &self.data_raw {
            write!(f, " {:02X}", byte)?;
        }
        writeln!(f)
    }
}

impl FromStr for RawDescriptor {
    type Err = ShockError;

    fn from_str(text: &str) -> Result<Self> {
        let mut protocol = None;
        let mut bit = None;
        let mut te_us = None;
        let mut bit_raw = None;
        let mut data_raw = None;

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let (key, value) = line.split_once(':').ok_or_else(|| {
                ShockError::Protocol(format!("Malformed descriptor line: {}", line))
            })?;
            let value = value.trim();

            match key.trim() {
                "Protocol" => protocol = Some(value.to_string()),
                "Bit" => bit = Some(parse_number(key, value)?),
                "TE" => te_us = Some(parse_number(key, value)?),
                "Bit_RAW" => bit_raw = Some(parse_number(key, value)?),
                "Data_RAW" => data_raw = Some(parse_hex_bytes(value)?),
                _ => {}
            }
        }

        let descriptor = RawDescriptor {
            protocol: protocol.ok_or_else(|| missing("Protocol"))?,
            bit: bit.ok_or_else(|| missing("Bit"))?,
            te_us: te_us.ok_or_else(|| missing("TE"))?,
            bit_raw: bit_raw.ok_or_else(|| missing("Bit_RAW"))?,
            data_raw: data_raw.ok_or_else(|| missing("Data_RAW"))?,
        };
        descriptor.validate()?;

        Ok(descriptor)
    }
}

/// Embed a frame's symbol stream between the fixed preamble and postamble
///
/// # Examples
///
/// ```
/// use shock_remote::shocker::descriptor::build_descriptor;
/// use shock_remote::shocker::encoder::encode;
/// use shock_remote::shocker::protocol::{Channel, Mode};
///
/// let (_, symbols) = encode(Channel::Ch01, Mode::Shock, 10);
/// let descriptor = build_descriptor(&symbols);
/// assert_eq!(descriptor.data_raw.len() * 8, 256);
/// ```
pub fn build_descriptor(symbols: &SymbolStream) -> RawDescriptor {
    let mut data_raw =
        Vec::with_capacity(RAW_PREAMBLE.len() + FRAME_SYMBOL_COUNT / 2 + RAW_POSTAMBLE.len());
    data_raw.extend_from_slice(RAW_PREAMBLE);
    data_raw.extend(symbols.as_str().split(' ').map(symbol_pair_byte));
    data_raw.extend_from_slice(RAW_POSTAMBLE);

    RawDescriptor {
        protocol: PROTOCOL_BINRAW.to_string(),
        bit: RAW_BIT_COUNT,
        te_us: SYMBOL_TE_US,
        bit_raw: RAW_BIT_COUNT,
        data_raw,
    }
}

/// `E` is nibble 0xE and `8` is nibble 0x8
fn symbol_pair_byte(pair: &str) -> u8 {
    pair.chars().fold(0u8, |acc, symbol| {
        let nibble = if symbol == SYMBOL_ONE { 0x0E } else { 0x08 };
        acc << 4 | nibble
    })
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| ShockError::Protocol(format!("Invalid {} value: {}", key.trim(), value)))
}

fn parse_hex_bytes(value: &str) -> Result<Vec<u8>> {
    value
        .split_whitespace()
        .map(|token| {
            u8::from_str_radix(token, 16)
                .map_err(|_| ShockError::Protocol(format!("Invalid Data_RAW byte: {}", token)))
        })
        .collect()
}

fn missing(key: &str) -> ShockError {
    ShockError::Protocol(format!("Descriptor is missing {}", key))
}
