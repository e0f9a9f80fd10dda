//! # MQTT Transport Session
//!
//! Production [`TransportSession`] over `rumqttc`.
//!
//! The telemetry feed is best-effort: subscriptions use QoS 0 (at most
//! once), and a lost broker connection is reported upward instead of being
//! retried here, so the connection manager owns all reconnect timing.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use tracing::{debug, warn};

use super::{TransportEvent, TransportSession};
use crate::config::MqttConfig;
use crate::error::TransportError;

/// In-flight event queue capacity handed to the rumqttc client
const EVENT_QUEUE_CAPACITY: usize = 64;

/// MQTT session handle.
///
/// `connect` builds a fresh client and event loop each time, so a session
/// torn down after a connection loss leaves no state behind for the next
/// attempt.
pub struct MqttTransport {
    host: String,
    port: u16,
    client_id_prefix: String,
    keep_alive: Duration,
    client: Option<AsyncClient>,
    event_loop: Option<EventLoop>,
}

impl std::fmt::Debug for MqttTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connected", &self.client.is_some())
            .finish_non_exhaustive()
    }
}

impl MqttTransport {
    pub fn new(config: &MqttConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            client_id_prefix: config.client_id_prefix.clone(),
            keep_alive: Duration::from_secs(config.keep_alive_s),
            client: None,
            event_loop: None,
        }
    }

    /// Fresh client id per session attempt, e.g. `dashboard-493021`
    fn next_client_id(&self) -> String {
        format!(
            "{}-{}",
            self.client_id_prefix,
            Utc::now().timestamp_millis() % 1_000_000
        )
    }

    /// Drop the client and event loop after a dead session
    fn teardown(&mut self) {
        self.client = None;
        self.event_loop = None;
    }
}

#[async_trait]
impl TransportSession for MqttTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let client_id = self.next_client_id();
        debug!("Opening MQTT session to {}:{} as {}", self.host, self.port, client_id);

        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);

        let (client, event_loop) = AsyncClient::new(options, EVENT_QUEUE_CAPACITY);
        self.client = Some(client);
        self.event_loop = Some(event_loop);

        // The TCP connect and CONNACK handshake happen while the event loop
        // is polled; failures surface as a ConnectionLost event.
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| TransportError::Subscribe("no active session".to_string()))?;

        client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| TransportError::Subscribe(e.to_string()))
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        loop {
            let polled = match self.event_loop.as_mut() {
                Some(event_loop) => event_loop.poll().await,
                None => return None,
            };

            match polled {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        return Some(TransportEvent::Connected);
                    }
                    warn!("Broker refused connection: {:?}", ack.code);
                    self.teardown();
                    return Some(TransportEvent::ConnectionLost {
                        code: 1,
                        reason: format!("broker refused connection: {:?}", ack.code),
                    });
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Some(TransportEvent::Message {
                        topic: publish.topic,
                        payload: publish.payload,
                    });
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    self.teardown();
                    return Some(TransportEvent::ConnectionLost {
                        code: 1,
                        reason: "broker closed the session".to_string(),
                    });
                }
                // Pings, acks and outgoing traffic are not the manager's
                // concern
                Ok(_) => continue,
                Err(e) => {
                    self.teardown();
                    return Some(TransportEvent::ConnectionLost {
                        code: 1,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(client) = self.client.take() {
            // A session already torn down by the broker is fine to release
            if let Err(e) = client.disconnect().await {
                debug!("MQTT disconnect after dead session: {}", e);
            }
        }
        self.event_loop = None;
        Ok(())
    }
}
