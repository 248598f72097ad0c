//! # UI Module
//!
//! Knob-driven terminal UI that feeds strengths to the transmitter.
//!
//! This module handles:
//! - The 0-99 wraparound knob
//! - Scene flow between the strength and repeat screens
//! - Reading knob input from stdin or an evdev keypad

pub mod input;
pub mod knob;
pub mod scene;
