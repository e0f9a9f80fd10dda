//! # Telemetry Store
//!
//! Process-wide holder of the latest accepted snapshot plus link health.
//!
//! The store has a single writer (the ingestion task) and many readers (the
//! display side). Each accepted snapshot replaces the current one wholesale,
//! so readers always observe a complete message and never a mix of fields
//! from two different messages.

use std::sync::{Arc, RwLock};

use super::snapshot::{GeoPoint, Snapshot};
use crate::error::DecodeError;

/// Connectivity status as seen by the user
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkHealth {
    /// True while the transport session is established and subscribed
    pub connected: bool,

    /// Most recent transport or decode error message, if any
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct StoreInner {
    snapshot: Arc<Snapshot>,
    link: LinkHealth,
    decode_errors: u64,
}

/// Shared handle to the current telemetry state.
///
/// Cloning is cheap; all clones observe the same state. Readers receive an
/// `Arc` to an immutable snapshot, so a publish happening concurrently with
/// a read can never tear the fields of a message apart.
#[derive(Debug, Clone)]
pub struct TelemetryStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl TelemetryStore {
    /// Create a store holding pre-first-message defaults, with the map
    /// position at the given fallback coordinate.
    pub fn new(fallback: GeoPoint) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                snapshot: Arc::new(Snapshot::initial(fallback)),
                link: LinkHealth::default(),
                decode_errors: 0,
            })),
        }
    }

    /// Atomically replace the current snapshot with a newly accepted one
    pub fn publish(&self, snapshot: Snapshot) {
        let mut inner = self.inner.write().expect("telemetry store lock poisoned");
        inner.snapshot = Arc::new(snapshot);
    }

    /// Latest published snapshot, or the defaults before the first message
    pub fn current(&self) -> Arc<Snapshot> {
        let inner = self.inner.read().expect("telemetry store lock poisoned");
        Arc::clone(&inner.snapshot)
    }

    /// Update connection status independent of telemetry content.
    ///
    /// Losing the connection does NOT clear the last known snapshot; stale
    /// but visible data beats a blanked display during reconnects.
    pub fn set_connectivity(&self, connected: bool, error: Option<String>) {
        let mut inner = self.inner.write().expect("telemetry store lock poisoned");
        inner.link = LinkHealth {
            connected,
            last_error: error,
        };
    }

    /// Current connectivity flag and last error message
    pub fn connectivity(&self) -> LinkHealth {
        let inner = self.inner.read().expect("telemetry store lock poisoned");
        inner.link.clone()
    }

    /// Record a per-message decode failure: bump the counter and surface the
    /// message to the user without touching the current snapshot.
    pub fn record_decode_error(&self, error: &DecodeError) {
        let mut inner = self.inner.write().expect("telemetry store lock poisoned");
        inner.decode_errors += 1;
        inner.link.last_error = Some(error.to_string());
    }

    /// Number of messages dropped by the decoder since startup
    pub fn decode_errors(&self) -> u64 {
        let inner = self.inner.read().expect("telemetry store lock poisoned");
        inner.decode_errors
    }
}
