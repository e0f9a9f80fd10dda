//! # Transport Session Boundary
//!
//! Trait abstraction over the publish/subscribe transport session.
//!
//! The ingestion pipeline never talks to a concrete MQTT client directly; it
//! drives a [`TransportSession`] and consumes [`TransportEvent`]s one at a
//! time, preserving arrival order. This keeps the connection state machine
//! testable against a scripted mock transport.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

pub mod mqtt;

/// Disconnect code for a deliberate, client-initiated teardown. Any other
/// code is an abnormal loss and triggers the reconnect path.
pub const DISCONNECT_NORMAL: i32 = 0;

/// Events delivered by the transport session, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Session established and acknowledged by the broker
    Connected,

    /// Session dropped; `code` distinguishes a normal disconnect
    /// ([`DISCONNECT_NORMAL`]) from a transport failure
    ConnectionLost { code: i32, reason: String },

    /// One raw telemetry message
    Message { topic: String, payload: Bytes },
}

/// Async transport session contract required by the connection manager.
///
/// Implementations are expected to make `disconnect` idempotent: releasing
/// an already-released session is a no-op, never an error.
#[async_trait]
pub trait TransportSession: Send {
    /// Begin establishing the session. Failures that surface asynchronously
    /// (broker unreachable, refused connection) arrive later as a
    /// [`TransportEvent::ConnectionLost`] rather than an error here.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Subscribe to the telemetry topic on an established session
    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Next event from the session, or `None` once the session is closed
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Release the session. Safe to call from any state, any number of times.
    async fn disconnect(&mut self) -> Result<(), TransportError>;
}
