//! # Raw Transmitter and Waveform
//!
//! Protocol environment, registry lookup, and the BinRAW transmitter that turns
//! a [`RawDescriptor`] into the level/duration pairs the radio plays back.

use tracing::debug;

use crate::error::{Result, ShockError};
use crate::shocker::descriptor::RawDescriptor;
use crate::shocker::protocol::PROTOCOL_BINRAW;

/// One run of constant carrier level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelDuration {
    /// Carrier on (`true`) or off (`false`)
    pub level: bool,

    /// Run length in microseconds
    pub duration_us: u32,
}

impl LevelDuration {
    pub fn new(level: bool, duration_us: u32) -> Self {
        Self { level, duration_us }
    }
}

/// OOK waveform ready for async transmission
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Waveform {
    items: Vec<LevelDuration>,
}

impl Waveform {
    /// Build a waveform from a descriptor, one TE per bit, equal levels merged
    pub fn from_descriptor(descriptor: &RawDescriptor) -> Self {
        let mut items: Vec<LevelDuration> = Vec::new();

        for level in descriptor.bits() {
            match items.last_mut() {
                Some(last) if last.level == level => {
                    last.duration_us = last.duration_us.saturating_add(descriptor.te_us)
                }
                _ => items.push(LevelDuration::new(level, descriptor.te_us)),
            }
        }

        Self { items }
    }

    /// Number of level runs
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all run durations in microseconds
    pub fn total_duration_us(&self) -> u64 {
        self.items.iter().map(|item| item.duration_us as u64).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LevelDuration> {
        self.items.iter()
    }
}

impl IntoIterator for Waveform {
    type Item = LevelDuration;
    type IntoIter = std::vec::IntoIter<LevelDuration>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Set of protocol names the environment can build transmitters for
#[derive(Debug)]
pub struct ProtocolRegistry {
    protocols: &'static [&'static str],
}

impl ProtocolRegistry {
    pub fn contains(&self, name: &str) -> bool {
        self.protocols.contains(&name)
    }

    /// Registry entry for `name`, if registered
    fn lookup(&self, name: &str) -> Option<&'static str> {
        self.protocols.iter().copied().find(|&p| p == name)
    }
}

/// The only protocol this transmitter speaks is BinRAW
pub static PROTOCOL_REGISTRY: ProtocolRegistry = ProtocolRegistry {
    protocols: &[PROTOCOL_BINRAW],
};

/// Protocol environment bound to a registry
#[derive(Debug)]
pub struct ProtocolEnvironment {
    registry: &'static ProtocolRegistry,
}

impl ProtocolEnvironment {
    /// Create an environment bound to `registry`
    pub fn new(registry: &'static ProtocolRegistry) -> Self {
        Self { registry }
    }

    /// Allocate a transmitter for a registered protocol
    ///
    /// # Errors
    ///
    /// Returns `Protocol` error if `name` is not in the registry
    pub fn transmitter(&self, name: &str) -> Result<RawTransmitter> {
        let protocol = self
            .registry
            .lookup(name)
            .ok_or_else(|| ShockError::Protocol(format!("Unknown protocol: {}", name)))?;

        debug!("Allocated {} transmitter", protocol);
        Ok(RawTransmitter {
            protocol,
            descriptor: None,
        })
    }
}

impl Default for ProtocolEnvironment {
    fn default() -> Self {
        Self::new(&PROTOCOL_REGISTRY)
    }
}

/// Transmitter context for one protocol
#[derive(Debug)]
pub struct RawTransmitter {
    protocol: &'static str,
    descriptor: Option<RawDescriptor>,
}

impl RawTransmitter {
    pub fn protocol(&self) -> &str {
        self.protocol
    }

    /// Load a descriptor from its text form
    ///
    /// # Errors
    ///
    /// Returns `Protocol` error if the text does not parse or names a
    /// different protocol than this transmitter was allocated for
    pub fn deserialize(&mut self, text: &str) -> Result<()> {
        let descriptor: RawDescriptor = text.parse()?;

        if descriptor.protocol != self.protocol {
            return Err(ShockError::Protocol(format!(
                "Descriptor protocol {} does not match transmitter {}",
                descriptor.protocol, self.protocol
            )));
        }

        self.descriptor = Some(descriptor);
        Ok(())
    }

    /// Waveform of the loaded descriptor
    ///
    /// # Errors
    ///
    /// Returns `Protocol` error if nothing has been loaded yet
    pub fn waveform(&self) -> Result<Waveform> {
        self.descriptor
            .as_ref()
            .map(Waveform::from_descriptor)
            .ok_or_else(|| ShockError::Protocol("Transmitter has no descriptor loaded".to_string()))
    }
}
