//! # Error Types
//!
//! Custom error types for Shock Remote using `thiserror`.

use thiserror::Error;

/// Main error type for Shock Remote
#[derive(Debug, Error)]
pub enum ShockError {
    /// Raw descriptor / protocol registry errors
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Radio device errors
    #[error("Radio error: {0}")]
    Radio(String),

    /// No radio device registered under the requested name
    #[error("Radio device not found: {0}")]
    DeviceNotFound(String),

    /// Charge suppression errors
    #[error("Power control error: {0}")]
    Power(String),

    /// Keypad / stdin input errors
    #[error("Input error: {0}")]
    Input(String),

    /// Transmission log serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Shock Remote
pub type Result<T> = std::result::Result<T, ShockError>;
