//! # Groundlink
//!
//! Live rocket flight telemetry ingestion over MQTT.
//!
//! Connects to the telemetry broker, subscribes to the flight computer's
//! topic and keeps the latest-value store and time-series buffers up to
//! date while printing a periodic status line. The ingestion pipeline runs
//! on a single task; this binary is just its harness plus a read-only
//! status consumer.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{info, warn};
use tracing_subscriber;

mod config;
mod error;
mod link;
mod telemetry;
mod transport;

use config::Config;
use link::ConnectionManager;
use telemetry::series::{Channel, SeriesSet};
use telemetry::snapshot::GeoPoint;
use telemetry::store::TelemetryStore;
use transport::mqtt::MqttTransport;

/// Configuration file consulted when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for Groundlink
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (defaults when no file is present)
///    - Build the telemetry store and series buffers
///
/// 2. **Ingestion**
///    - Spawn the connection manager as the single ingestion task
///    - It connects, subscribes, decodes and fans out every message,
///      reconnecting on its own after transport failures
///
/// 3. **Status / Shutdown**
///    - Log a status line at a fixed cadence from the read side
///    - Handle Ctrl+C by signalling shutdown and joining the ingestion task
///
/// # Errors
///
/// Returns error if the configuration file is invalid or the ingestion task
/// fails to join. Transport and decode failures are not fatal; they surface
/// in the status line instead.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("Groundlink v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = if Path::new(&config_path).exists() {
        Config::load(&config_path)?
    } else {
        warn!("No configuration file at {}; using defaults", config_path);
        Config::default()
    };

    let store = TelemetryStore::new(GeoPoint {
        latitude: config.telemetry.fallback_latitude,
        longitude: config.telemetry.fallback_longitude,
    });
    let series = SeriesSet::new(Duration::from_millis(config.telemetry.window_ms));

    let transport = MqttTransport::new(&config.mqtt);
    let manager = ConnectionManager::new(
        transport,
        store.clone(),
        series.clone(),
        &config.mqtt,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ingestion = tokio::spawn(manager.run(shutdown_rx));

    info!(
        "Ingesting from {}:{} topic {}",
        config.mqtt.host, config.mqtt.port, config.mqtt.topic
    );
    info!("Press Ctrl+C to exit");

    let mut status = interval(Duration::from_millis(config.telemetry.status_interval_ms));

    // Read-side loop: the status line stands in for the display layer and
    // only ever reads through the store/series handles
    loop {
        tokio::select! {
            _ = status.tick() => {
                let snapshot = store.current();
                let link = store.connectivity();
                info!(
                    "state={} mode={} battery={:.1}V agl={:.1}m alt={:.1}m connected={} buffered={} dropped={}",
                    snapshot.state,
                    snapshot.operation_mode,
                    snapshot.battery_voltage,
                    snapshot.altitude.agl,
                    snapshot.position.gps_altitude,
                    link.connected,
                    series.depth(Channel::Altitude),
                    store.decode_errors(),
                );
                if let Some(error) = link.last_error {
                    warn!("Last error: {}", error);
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    ingestion.await??;

    info!("Goodbye");
    Ok(())
}
