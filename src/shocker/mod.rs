//! # Shocker Protocol Module
//!
//! Implementation of the collar remote command protocol.
//!
//! This module handles:
//! - Command frame encoding (id, channel/mode nibbles, strength, checksum)
//! - 8-bit sum checksum calculation
//! - Frame to `E`/`8` symbol stream expansion
//! - BinRAW descriptor generation and parsing

pub mod protocol;
pub mod encoder;
pub mod descriptor;
pub mod checksum;
