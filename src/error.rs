//! # Error Types
//!
//! Custom error types for Tracker Uplink using `thiserror`.

use thiserror::Error;

/// Main error type for Tracker Uplink
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Broker connection could not be established
    #[error("MQTT connection error: {0}")]
    Connection(String),

    /// Subscribe/publish request rejected by the client
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// Sensor read failures (ADC)
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Telemetry snapshot could not be decoded
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Result type alias for Tracker Uplink
pub type Result<T> = std::result::Result<T, TrackerError>;
