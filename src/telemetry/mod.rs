//! # Telemetry Module
//!
//! Transmission log written as JSON Lines, one record per transmit call.
//!
//! This module handles:
//! - Building a record from the command, its frame and the session outcome
//! - Appending records to a JSONL file
//! - Rotating the file after a fixed number of records

pub mod logger;
pub mod types;

pub use logger::{RotationPolicy, TransmissionLog};
pub use types::{OutcomeKind, TransmissionRecord};
