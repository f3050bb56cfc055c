//! # Error Types
//!
//! Custom error types for Sensor Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Sensor Bridge
#[derive(Debug, Error)]
pub enum SensorBridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Telemetry record serialization errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),
}

/// Result type alias for Sensor Bridge
pub type Result<T> = std::result::Result<T, SensorBridgeError>;

/// Maximum length of an error label written to the measurement log
pub const ERROR_LABEL_MAX_LEN: usize = 16;

/// Per-tick decode failures
///
/// Every variant is recovered inside the tick that produced it: the engine
/// writes a sentinel record, notifies the operator and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Disconnect threshold exceeded
    #[error("no data received for {ticks} ticks")]
    NoData { ticks: u32 },

    /// Missing or incorrect start/end delimiters
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Checksum mismatch or malformed checksum trailer
    #[error("checksum verification failed: {0}")]
    ChecksumFail(String),

    /// Field or measurement count mismatch
    #[error("parsing failed: {0}")]
    ParsingFail(String),
}

impl DecodeError {
    /// Fixed label written into the error column of the measurement log
    ///
    /// Always at most [`ERROR_LABEL_MAX_LEN`] bytes.
    pub fn label(&self) -> &'static str {
        match self {
            DecodeError::NoData { .. } => "No data",
            DecodeError::InvalidFrame(_) => "Invalid frame",
            DecodeError::ChecksumFail(_) => "Checksum fail",
            DecodeError::ParsingFail(_) => "Parsing fail",
        }
    }
}
