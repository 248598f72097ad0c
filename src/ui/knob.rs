//! Two-digit rotary counter

use std::fmt;

/// Highest knob value
pub const KNOB_MAX: u8 = 99;

/// Counter in `0..=KNOB_MAX` that wraps at both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Knob {
    value: u8,
}

impl Knob {
    /// Create a knob at `value`, clamped into range
    pub fn new(value: u8) -> Self {
        Self {
            value: value.min(KNOB_MAX),
        }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Step up; 99 wraps to 0
    pub fn increment(&mut self) {
        self.value = if self.value >= KNOB_MAX { 0 } else { self.value + 1 };
    }

    /// Step down; 0 wraps to 99
    pub fn decrement(&mut self) {
        self.value = if self.value == 0 { KNOB_MAX } else { self.value - 1 };
    }

    pub fn set(&mut self, value: u8) {
        self.value = value.min(KNOB_MAX);
    }
}

impl fmt::Display for Knob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_wraps() {
        let mut knob = Knob::new(98);
        knob.increment();
        assert_eq!(knob.value(), 99);
        knob.increment();
        assert_eq!(knob.value(), 0);
    }

    #[test]
    fn test_decrement_wraps() {
        let mut knob = Knob::new(1);
        knob.decrement();
        assert_eq!(knob.value(), 0);
        knob.decrement();
        assert_eq!(knob.value(), 99);
    }

    #[test]
    fn test_full_turn_returns_to_start() {
        let mut knob = Knob::new(42);
        for _ in 0..=KNOB_MAX {
            knob.increment();
        }
        assert_eq!(knob.value(), 42);
    }

    #[test]
    fn test_new_and_set_clamp() {
        assert_eq!(Knob::new(150).value(), 99);

        let mut knob = Knob::default();
        knob.set(255);
        assert_eq!(knob.value(), 99);
        knob.set(7);
        assert_eq!(knob.value(), 7);
    }

    #[test]
    fn test_display_two_digits() {
        assert_eq!(Knob::new(7).to_string(), "07");
        assert_eq!(Knob::new(0).to_string(), "00");
        assert_eq!(Knob::new(99).to_string(), "99");
    }
}
