//! # Telemetry Payload Decoder
//!
//! Parses raw JSON telemetry payloads into validated [`Snapshot`]s.
//!
//! Decoding is pure: no shared state is touched until a payload has been
//! fully parsed and every numeric field checked. A malformed message yields
//! an error and nothing else.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::snapshot::{
    AltitudeReading, AngularRate, Attitude, ChuteState, Position, Snapshot,
};
use crate::error::DecodeError;

/// Wire schema of one telemetry message as published by the avionics.
///
/// Every field is required; serde rejects missing or mistyped fields, which
/// surfaces as [`DecodeError::Malformed`]. Unknown extra fields are ignored.
#[derive(Debug, Deserialize)]
struct WirePacket {
    id: u32,
    state: i32,
    operation_mode: i32,
    acc_data: WireAcc,
    gyro_data: WireGyro,
    gps_data: WireGps,
    alt_data: WireAlt,
    chute_state: WireChute,
    battery_voltage: f64,
}

#[derive(Debug, Deserialize)]
struct WireAcc {
    ax: f64,
    ay: f64,
    az: f64,
    pitch: f64,
    roll: f64,
}

#[derive(Debug, Deserialize)]
struct WireGyro {
    gx: f64,
    gy: f64,
    gz: f64,
}

#[derive(Debug, Deserialize)]
struct WireGps {
    latitude: f64,
    longitude: f64,
    gps_altitude: f64,
    time: f64,
}

#[derive(Debug, Deserialize)]
struct WireAlt {
    pressure: f64,
    temperature: f64,
    #[serde(rename = "AGL")]
    agl: f64,
    velocity: f64,
}

#[derive(Debug, Deserialize)]
struct WireChute {
    pyro1_state: u8,
    pyro2_state: u8,
}

/// Decode a raw telemetry payload into a [`Snapshot`].
///
/// The snapshot's `received_at` is the local time of decode completion, not
/// any time field carried in the payload.
///
/// # Arguments
///
/// * `raw` - Raw message payload as received from the transport
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] for unparseable or structurally
/// incomplete payloads and [`DecodeError::InvalidValue`] for NaN/infinite
/// numeric fields. No partial snapshot is ever produced.
pub fn decode(raw: &[u8]) -> Result<Snapshot, DecodeError> {
    decode_at(raw, Utc::now())
}

/// Decode with an explicit capture time. Used directly by tests that need
/// deterministic timestamps; [`decode`] is the production entry point.
pub fn decode_at(raw: &[u8], received_at: DateTime<Utc>) -> Result<Snapshot, DecodeError> {
    let packet: WirePacket =
        serde_json::from_slice(raw).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    packet.into_snapshot(received_at)
}

/// Reject NaN and infinity before they can reach the displays
fn finite(field: &str, value: f64) -> Result<f64, DecodeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DecodeError::InvalidValue(format!("{} is not finite", field)))
    }
}

impl WirePacket {
    fn into_snapshot(self, received_at: DateTime<Utc>) -> Result<Snapshot, DecodeError> {
        Ok(Snapshot {
            id: self.id,
            state: self.state,
            operation_mode: self.operation_mode,
            attitude: Attitude {
                accel_x: finite("acc_data.ax", self.acc_data.ax)?,
                accel_y: finite("acc_data.ay", self.acc_data.ay)?,
                accel_z: finite("acc_data.az", self.acc_data.az)?,
                pitch: finite("acc_data.pitch", self.acc_data.pitch)?,
                roll: finite("acc_data.roll", self.acc_data.roll)?,
            },
            angular_rate: AngularRate {
                gx: finite("gyro_data.gx", self.gyro_data.gx)?,
                gy: finite("gyro_data.gy", self.gyro_data.gy)?,
                gz: finite("gyro_data.gz", self.gyro_data.gz)?,
            },
            position: Position {
                latitude: finite("gps_data.latitude", self.gps_data.latitude)?,
                longitude: finite("gps_data.longitude", self.gps_data.longitude)?,
                gps_altitude: finite("gps_data.gps_altitude", self.gps_data.gps_altitude)?,
                gps_time: finite("gps_data.time", self.gps_data.time)?,
            },
            altitude: AltitudeReading {
                pressure: finite("alt_data.pressure", self.alt_data.pressure)?,
                temperature: finite("alt_data.temperature", self.alt_data.temperature)?,
                agl: finite("alt_data.AGL", self.alt_data.agl)?,
                vertical_velocity: finite("alt_data.velocity", self.alt_data.velocity)?,
            },
            chute: ChuteState {
                drogue_deployed: self.chute_state.pyro1_state != 0,
                main_deployed: self.chute_state.pyro2_state != 0,
            },
            battery_voltage: finite("battery_voltage", self.battery_voltage)?,
            received_at,
        })
    }
}
