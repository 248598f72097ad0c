//! Transmission log record types

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::shocker::encoder::Frame;
use crate::shocker::protocol::Command;
use crate::subghz::session::TransmitOutcome;

/// Result classification stored in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Completed,
    StartFailed,
    PollLimitReached,
    Error,
}

/// One line of the transmission log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransmissionRecord {
    pub timestamp: DateTime<Utc>,
    pub channel: String,
    pub mode: String,
    pub strength: u8,
    /// Frame bytes as space separated hex (e.g., "DD C8 01 0A B0")
    pub frame: String,
    pub outcome: OutcomeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polls: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_frequency_hz: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransmissionRecord {
    fn base(command: &Command, frame: &Frame, outcome: OutcomeKind) -> Self {
        Self {
            timestamp: Utc::now(),
            channel: command.channel.to_string(),
            mode: command.mode.to_string(),
            strength: command.strength,
            frame: frame.to_string(),
            outcome,
            polls: None,
            actual_frequency_hz: None,
            error: None,
        }
    }

    /// Record for a session that reached the transmitting stage
    pub fn from_outcome(command: &Command, frame: &Frame, outcome: &TransmitOutcome) -> Self {
        match *outcome {
            TransmitOutcome::Completed { polls, actual_frequency_hz } => Self {
                polls: Some(polls),
                actual_frequency_hz: Some(actual_frequency_hz),
                ..Self::base(command, frame, OutcomeKind::Completed)
            },
            TransmitOutcome::StartFailed => Self::base(command, frame, OutcomeKind::StartFailed),
            TransmitOutcome::PollLimitReached { polls } => Self {
                polls: Some(polls),
                ..Self::base(command, frame, OutcomeKind::PollLimitReached)
            },
        }
    }

    /// Record for a session that failed during setup
    pub fn from_error(command: &Command, frame: &Frame, error: &dyn std::fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::base(command, frame, OutcomeKind::Error)
        }
    }
}
