//! # Telemetry Module
//!
//! The telemetry ingestion core.
//!
//! This module handles:
//! - The immutable telemetry snapshot data model
//! - Decoding raw JSON payloads into validated snapshots
//! - The process-wide latest-value store read by the displays
//! - Bounded time-series buffers for the live charts

pub mod decoder;
pub mod series;
pub mod snapshot;
pub mod store;
