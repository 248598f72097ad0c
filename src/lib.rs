//! # Shock Remote Library
//!
//! Encode shock collar remote commands and transmit them over a sub-GHz OOK radio.
//!
//! This library provides the frame encoder, the transmission session that
//! drives the radio, and the knob UI that feeds it.

pub mod config;
pub mod error;
pub mod shocker;
pub mod subghz;
pub mod telemetry;
pub mod ui;
