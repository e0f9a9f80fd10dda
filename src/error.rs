//! # Error Types
//!
//! Custom error types for Groundlink using `thiserror`.

use thiserror::Error;

/// Errors produced while decoding a raw telemetry payload.
///
/// A decode error never leaves partially-built telemetry behind: the
/// offending message is dropped and ingestion continues with the next one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload is not a structurally valid telemetry document
    /// (unparseable JSON, missing field, wrong type).
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// Payload parsed but carries a numeric value that must not reach
    /// the displays (NaN or infinite).
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Errors reported by the transport session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Session could not be established.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Subscription to the telemetry topic was refused.
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// Session teardown failed.
    #[error("disconnect failed: {0}")]
    Disconnect(String),
}

/// Main error type for Groundlink
#[derive(Debug, Error)]
pub enum GroundlinkError {
    /// Telemetry decode errors
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Transport session errors
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Groundlink
pub type Result<T> = std::result::Result<T, GroundlinkError>;
