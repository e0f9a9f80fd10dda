//! # Groundlink Library
//!
//! Live rocket flight telemetry ingestion and distribution over MQTT.
//!
//! This library receives the asynchronous telemetry stream published by the
//! flight computer, validates and decodes each message, and fans the data
//! out to the latest-value store and the per-signal time-series buffers that
//! the ground station displays read from.

pub mod config;
pub mod error;
pub mod link;
pub mod telemetry;
pub mod transport;
