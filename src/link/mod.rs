//! # Connection Manager
//!
//! Owns the transport session lifecycle and drives the ingestion pipeline.
//!
//! This module handles:
//! - The connect / subscribe / reconnect / disconnect state machine
//! - Forwarding raw messages to the decoder, one at a time, in arrival order
//! - Publishing accepted snapshots to the store and series buffers
//! - Recording transport and decode errors without ever tearing down the
//!   process
//!
//! Message arrival, decode and store/buffer updates all run on this single
//! task; the display side reads through its own store/series handles.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::config::MqttConfig;
use crate::error::Result;
use crate::telemetry::decoder;
use crate::telemetry::series::SeriesSet;
use crate::telemetry::store::TelemetryStore;
use crate::transport::{TransportEvent, TransportSession, DISCONNECT_NORMAL};

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No session; terminal unless a new connect is requested
    Disconnected,

    /// Session establishment in flight
    Connecting,

    /// Session established and subscribed to the telemetry topic
    Connected,

    /// Session lost; waiting for the retry timer
    Reconnecting,
}

/// Drives one transport session and the telemetry ingestion path.
///
/// Generic over the transport so tests can script a mock session; production
/// code plugs in [`crate::transport::mqtt::MqttTransport`].
pub struct ConnectionManager<T: TransportSession> {
    transport: T,
    store: TelemetryStore,
    series: SeriesSet,
    topic: String,
    retry_interval: Duration,
    /// 0 retries forever
    max_retries: u32,
    attempts: u32,
    state: LinkState,
    shut_down: bool,
}

impl<T: TransportSession> ConnectionManager<T> {
    pub fn new(
        transport: T,
        store: TelemetryStore,
        series: SeriesSet,
        config: &MqttConfig,
    ) -> Self {
        Self {
            transport,
            store,
            series,
            topic: config.topic.clone(),
            retry_interval: Duration::from_millis(config.reconnect_interval_ms),
            max_retries: config.max_reconnect_attempts,
            attempts: 0,
            state: LinkState::Disconnected,
            shut_down: false,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Run the ingestion loop until the session ends or shutdown is
    /// signalled. Consumes the manager; all observable effects flow through
    /// the store and series handles.
    ///
    /// The loop suspends only while awaiting the next transport event or the
    /// reconnect timer. A pending retry timer is cancelled by shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        self.begin_connect().await;

        loop {
            match self.state {
                LinkState::Disconnected => break,

                LinkState::Reconnecting => {
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                break;
                            }
                        }
                        _ = time::sleep(self.retry_interval) => {
                            self.attempts += 1;
                            info!("Reconnecting (attempt {})", self.attempts);
                            self.begin_connect().await;
                        }
                    }
                }

                LinkState::Connecting | LinkState::Connected => {
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                break;
                            }
                        }
                        event = self.transport.next_event() => match event {
                            Some(event) => self.handle_event(event).await,
                            None => {
                                debug!("Transport session closed");
                                self.state = LinkState::Disconnected;
                            }
                        }
                    }
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Start session establishment: `Disconnected/Reconnecting → Connecting`
    async fn begin_connect(&mut self) {
        self.state = LinkState::Connecting;
        info!("Connecting to telemetry feed on topic {}", self.topic);

        if let Err(e) = self.transport.connect().await {
            warn!("Connect failed: {}", e);
            self.enter_reconnecting(e.to_string());
        }
    }

    /// React to one transport event. Decode errors are per-message and never
    /// change the connection state.
    async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => match self.transport.subscribe(&self.topic).await {
                Ok(()) => {
                    info!("Connected; subscribed to {}", self.topic);
                    self.state = LinkState::Connected;
                    self.attempts = 0;
                    self.store.set_connectivity(true, None);
                }
                Err(e) => {
                    warn!("Subscribe failed: {}", e);
                    self.enter_reconnecting(e.to_string());
                }
            },

            TransportEvent::ConnectionLost { code, reason } => {
                if code == DISCONNECT_NORMAL {
                    info!("Session closed normally");
                    self.store.set_connectivity(false, None);
                    self.state = LinkState::Disconnected;
                } else {
                    warn!("Connection lost (code {}): {}", code, reason);
                    self.enter_reconnecting(reason);
                }
            }

            TransportEvent::Message { payload, .. } => match decoder::decode(&payload) {
                Ok(snapshot) => {
                    self.store.publish(snapshot);
                    self.series.ingest(&snapshot);
                    debug!("Accepted telemetry message id={}", snapshot.id);
                }
                Err(e) => {
                    warn!("Dropped telemetry message: {}", e);
                    self.store.record_decode_error(&e);
                }
            },
        }
    }

    /// Mark the link down and decide between another retry and giving up.
    /// The last known telemetry is left in place either way.
    fn enter_reconnecting(&mut self, reason: String) {
        self.store.set_connectivity(false, Some(reason));

        if self.max_retries != 0 && self.attempts >= self.max_retries {
            error!("Giving up after {} reconnect attempts", self.attempts);
            self.state = LinkState::Disconnected;
        } else {
            self.state = LinkState::Reconnecting;
        }
    }

    /// Release the transport session. Safe to call from any state and
    /// idempotent: only the first call reaches the transport.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.state = LinkState::Disconnected;

        info!("Releasing transport session");
        if let Err(e) = self.transport.disconnect().await {
            debug!("Disconnect during shutdown: {}", e);
        }
        self.store.set_connectivity(false, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::telemetry::series::{Channel, DEFAULT_WINDOW};
    use crate::telemetry::snapshot::GeoPoint;
    use crate::transport::mocks::MockTransport;
    use bytes::Bytes;

    const FALLBACK: GeoPoint = GeoPoint {
        latitude: -1.1,
        longitude: 37.01,
    };

    /// Full telemetry message matching the published wire schema
    const TELEMETRY_PAYLOAD: &str = r#"{
        "id": 1, "state": 1, "operation_mode": 0,
        "acc_data": {"ax": 1.0, "ay": 0.0, "az": 9.8, "pitch": 0.0, "roll": 0.0},
        "gyro_data": {"gx": 0.0, "gy": 0.0, "gz": 0.0},
        "gps_data": {"latitude": -1.1, "longitude": 37.01, "gps_altitude": 100.0, "time": 1.0},
        "alt_data": {"pressure": 1000.0, "temperature": 25.0, "AGL": 95.0, "velocity": 2.0},
        "chute_state": {"pyro1_state": 0, "pyro2_state": 0},
        "battery_voltage": 11.8
    }"#;

    struct Harness {
        manager: ConnectionManager<MockTransport>,
        transport: MockTransport,
        store: TelemetryStore,
        series: SeriesSet,
    }

    fn harness() -> Harness {
        let transport = MockTransport::new();
        let store = TelemetryStore::new(FALLBACK);
        let series = SeriesSet::new(DEFAULT_WINDOW);
        let manager = ConnectionManager::new(
            transport.clone(),
            store.clone(),
            series.clone(),
            &Config::default().mqtt,
        );
        Harness {
            manager,
            transport,
            store,
            series,
        }
    }

    fn message(payload: &str) -> TransportEvent {
        TransportEvent::Message {
            topic: "n4/telemetry".to_string(),
            payload: Bytes::copy_from_slice(payload.as_bytes()),
        }
    }

    #[tokio::test]
    async fn test_connected_subscribes_and_marks_link_up() {
        let mut h = harness();
        h.manager.begin_connect().await;
        assert_eq!(h.manager.state(), LinkState::Connecting);

        h.manager.handle_event(TransportEvent::Connected).await;

        assert_eq!(h.manager.state(), LinkState::Connected);
        assert_eq!(h.transport.subscriptions(), vec!["n4/telemetry"]);

        let link = h.store.connectivity();
        assert!(link.connected);
        assert!(link.last_error.is_none());
    }

    #[tokio::test]
    async fn test_valid_message_updates_store_and_buffers() {
        let mut h = harness();
        h.manager.handle_event(TransportEvent::Connected).await;

        h.manager.handle_event(message(TELEMETRY_PAYLOAD)).await;

        let current = h.store.current();
        assert_eq!(current.state, 1);
        assert_eq!(current.battery_voltage, 11.8);

        let altitude = h.series.view(Channel::Altitude);
        assert_eq!(altitude.len(), 1);
        assert_eq!(altitude[0].value, 100.0);
        assert_eq!(altitude[0].at, current.received_at);

        let agl = h.series.view(Channel::Agl);
        assert_eq!(agl[0].value, 95.0);
    }

    #[tokio::test]
    async fn test_malformed_message_changes_nothing_but_the_error_count() {
        let mut h = harness();
        h.manager.handle_event(TransportEvent::Connected).await;

        let before = *h.store.current();
        h.manager.handle_event(message(r#"{"state": 1}"#)).await;

        // Store and buffers untouched, stream still up
        assert_eq!(*h.store.current(), before);
        assert_eq!(h.series.depth(Channel::Altitude), 0);
        assert_eq!(h.manager.state(), LinkState::Connected);
        assert_eq!(h.store.decode_errors(), 1);
        assert!(h.store.connectivity().last_error.is_some());
    }

    #[tokio::test]
    async fn test_decode_error_does_not_interrupt_the_stream() {
        let mut h = harness();
        h.manager.handle_event(TransportEvent::Connected).await;

        h.manager.handle_event(message("garbage")).await;
        h.manager.handle_event(message(TELEMETRY_PAYLOAD)).await;

        assert_eq!(h.store.decode_errors(), 1);
        assert_eq!(h.store.current().state, 1);
        assert_eq!(h.series.depth(Channel::Altitude), 1);
    }

    #[tokio::test]
    async fn test_connection_lost_preserves_last_telemetry() {
        let mut h = harness();
        h.manager.handle_event(TransportEvent::Connected).await;
        h.manager.handle_event(message(TELEMETRY_PAYLOAD)).await;

        h.manager
            .handle_event(TransportEvent::ConnectionLost {
                code: 1,
                reason: "network error".to_string(),
            })
            .await;

        assert_eq!(h.manager.state(), LinkState::Reconnecting);

        let link = h.store.connectivity();
        assert!(!link.connected);
        assert_eq!(link.last_error.as_deref(), Some("network error"));

        // Stale-but-visible beats a blank display
        let current = h.store.current();
        assert_eq!(current.state, 1);
        assert_eq!(current.battery_voltage, 11.8);
    }

    #[tokio::test]
    async fn test_normal_disconnect_is_terminal() {
        let mut h = harness();
        h.manager.handle_event(TransportEvent::Connected).await;

        h.manager
            .handle_event(TransportEvent::ConnectionLost {
                code: DISCONNECT_NORMAL,
                reason: "client disconnect".to_string(),
            })
            .await;

        assert_eq!(h.manager.state(), LinkState::Disconnected);
        assert!(!h.store.connectivity().connected);
    }

    #[tokio::test]
    async fn test_connect_failure_enters_reconnecting() {
        let mut h = harness();
        h.transport.set_connect_error("broker unreachable");

        h.manager.begin_connect().await;

        assert_eq!(h.manager.state(), LinkState::Reconnecting);
        let link = h.store.connectivity();
        assert!(!link.connected);
        assert!(link.last_error.unwrap().contains("broker unreachable"));
    }

    #[tokio::test]
    async fn test_subscribe_failure_enters_reconnecting() {
        let mut h = harness();
        h.transport.set_subscribe_error("not authorized");

        h.manager.handle_event(TransportEvent::Connected).await;

        assert_eq!(h.manager.state(), LinkState::Reconnecting);
        assert!(!h.store.connectivity().connected);
    }

    #[tokio::test]
    async fn test_bounded_retries_eventually_give_up() {
        let transport = MockTransport::new();
        let store = TelemetryStore::new(FALLBACK);
        let series = SeriesSet::new(DEFAULT_WINDOW);
        let mut config = Config::default().mqtt;
        config.max_reconnect_attempts = 2;
        let mut manager =
            ConnectionManager::new(transport, store, series, &config);

        manager.attempts = 2;
        manager.enter_reconnecting("still down".to_string());

        assert_eq!(manager.state(), LinkState::Disconnected);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let mut h = harness();
        h.manager.handle_event(TransportEvent::Connected).await;

        h.manager.shutdown().await;
        h.manager.shutdown().await;

        assert_eq!(h.manager.state(), LinkState::Disconnected);
        assert_eq!(h.transport.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let h = harness();
        h.transport.push_event(TransportEvent::Connected);
        h.transport.park_when_empty();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(h.manager.run(shutdown_rx));

        // Let the manager connect and drain its script, then signal
        tokio::task::yield_now().await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        assert!(!h.store.connectivity().connected);
        assert_eq!(h.transport.disconnect_count(), 1);
        assert_eq!(h.transport.subscriptions(), vec!["n4/telemetry"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_after_the_interval() {
        let h = harness();
        // First session dies immediately; the replacement parks on its
        // (empty) event script
        h.transport.push_event(TransportEvent::ConnectionLost {
            code: 1,
            reason: "network error".to_string(),
        });
        h.transport.park_when_empty();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(h.manager.run(shutdown_rx));

        // Past one reconnect interval (paused time auto-advances)
        time::sleep(Duration::from_millis(1500)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        assert_eq!(h.transport.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_run_ends_when_the_session_closes() {
        let h = harness();
        h.transport.push_event(TransportEvent::Connected);
        // Script ends without parking: the session is gone

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        h.manager.run(shutdown_rx).await.unwrap();

        assert_eq!(h.transport.disconnect_count(), 1);
    }
}
