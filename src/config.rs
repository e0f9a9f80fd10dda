//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub telemetry: TelemetryConfig,
}

/// MQTT session configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MqttConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_topic")]
    pub topic: String,

    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,

    #[serde(default = "default_keep_alive_s")]
    pub keep_alive_s: u64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// Maximum reconnect attempts after a lost connection; 0 retries forever.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

/// Telemetry pipeline configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Sliding retention window for the time-series buffers, in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Latitude shown on the map until the first GPS fix arrives.
    #[serde(default = "default_fallback_latitude")]
    pub fallback_latitude: f64,

    /// Longitude shown on the map until the first GPS fix arrives.
    #[serde(default = "default_fallback_longitude")]
    pub fallback_longitude: f64,

    /// Cadence of the console status line, in milliseconds.
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

// Default value functions
fn default_host() -> String { "localhost".to_string() }
fn default_port() -> u16 { 1883 }
fn default_topic() -> String { "n4/telemetry".to_string() }
fn default_client_id_prefix() -> String { "dashboard".to_string() }
fn default_keep_alive_s() -> u64 { 3600 }
fn default_reconnect_interval_ms() -> u64 { 1000 }
fn default_max_reconnect_attempts() -> u32 { 0 }

fn default_window_ms() -> u64 { 10_000 }
fn default_fallback_latitude() -> f64 { -1.1 }
fn default_fallback_longitude() -> f64 { 37.01 }
fn default_status_interval_ms() -> u64 { 1000 }

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig {
                host: default_host(),
                port: default_port(),
                topic: default_topic(),
                client_id_prefix: default_client_id_prefix(),
                keep_alive_s: default_keep_alive_s(),
                reconnect_interval_ms: default_reconnect_interval_ms(),
                max_reconnect_attempts: default_max_reconnect_attempts(),
            },
            telemetry: TelemetryConfig {
                window_ms: default_window_ms(),
                fallback_latitude: default_fallback_latitude(),
                fallback_longitude: default_fallback_longitude(),
                status_interval_ms: default_status_interval_ms(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.mqtt.host.is_empty() {
            return Err(crate::error::GroundlinkError::Config(
                toml::de::Error::custom("mqtt host cannot be empty")
            ));
        }

        if self.mqtt.port == 0 {
            return Err(crate::error::GroundlinkError::Config(
                toml::de::Error::custom("mqtt port cannot be 0")
            ));
        }

        if self.mqtt.topic.is_empty() {
            return Err(crate::error::GroundlinkError::Config(
                toml::de::Error::custom("mqtt topic cannot be empty")
            ));
        }

        if self.mqtt.client_id_prefix.is_empty() {
            return Err(crate::error::GroundlinkError::Config(
                toml::de::Error::custom("client_id_prefix cannot be empty")
            ));
        }

        // Brokers commonly reject keep-alives under 5 seconds
        if self.mqtt.keep_alive_s < 5 || self.mqtt.keep_alive_s > 7200 {
            return Err(crate::error::GroundlinkError::Config(
                toml::de::Error::custom("keep_alive_s must be between 5 and 7200")
            ));
        }

        if self.mqtt.reconnect_interval_ms == 0 || self.mqtt.reconnect_interval_ms > 60000 {
            return Err(crate::error::GroundlinkError::Config(
                toml::de::Error::custom("reconnect_interval_ms must be between 1 and 60000")
            ));
        }

        if self.telemetry.window_ms < 100 || self.telemetry.window_ms > 600_000 {
            return Err(crate::error::GroundlinkError::Config(
                toml::de::Error::custom("window_ms must be between 100 and 600000")
            ));
        }

        if self.telemetry.status_interval_ms == 0 || self.telemetry.status_interval_ms > 60000 {
            return Err(crate::error::GroundlinkError::Config(
                toml::de::Error::custom("status_interval_ms must be between 1 and 60000")
            ));
        }

        if !(-90.0..=90.0).contains(&self.telemetry.fallback_latitude) {
            return Err(crate::error::GroundlinkError::Config(
                toml::de::Error::custom("fallback_latitude must be between -90 and 90")
            ));
        }

        if !(-180.0..=180.0).contains(&self.telemetry.fallback_longitude) {
            return Err(crate::error::GroundlinkError::Config(
                toml::de::Error::custom("fallback_longitude must be between -180 and 180")
            ));
        }

        Ok(())
    }
}
