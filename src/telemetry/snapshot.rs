//! # Telemetry Snapshot Types
//!
//! One fully-decoded telemetry message's worth of sensor and state data.
//!
//! A snapshot is built whole by the decoder or not at all; consumers only
//! ever see complete, validated values.

use chrono::{DateTime, Utc};

/// A geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Accelerometer-derived attitude data
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    /// Acceleration along the X axis in m/s²
    pub accel_x: f64,

    /// Acceleration along the Y axis in m/s²
    pub accel_y: f64,

    /// Acceleration along the Z axis in m/s²
    pub accel_z: f64,

    /// Pitch angle in degrees
    pub pitch: f64,

    /// Roll angle in degrees
    pub roll: f64,
}

/// Gyroscope angular rates in deg/s
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngularRate {
    pub gx: f64,
    pub gy: f64,
    pub gz: f64,
}

/// GPS position fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Latitude in decimal degrees
    pub latitude: f64,

    /// Longitude in decimal degrees
    pub longitude: f64,

    /// GPS altitude in meters above sea level
    pub gps_altitude: f64,

    /// GPS time-of-fix as reported by the receiver
    pub gps_time: f64,
}

/// Barometric and thermal altitude readings
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AltitudeReading {
    /// Barometric pressure in hPa
    pub pressure: f64,

    /// Ambient temperature in °C
    pub temperature: f64,

    /// Height above ground level in meters
    pub agl: f64,

    /// Vertical velocity in m/s
    pub vertical_velocity: f64,
}

/// Parachute deployment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChuteState {
    /// Drogue chute pyro has fired
    pub drogue_deployed: bool,

    /// Main chute pyro has fired
    pub main_deployed: bool,
}

/// One fully-decoded telemetry message.
///
/// Immutable after construction: the ingestion pipeline replaces the current
/// snapshot wholesale, never field by field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Source sequence identifier; not assumed monotonic or gap-free
    pub id: u32,

    /// Flight-state code reported by the avionics
    pub state: i32,

    /// Ground/flight operation mode code
    pub operation_mode: i32,

    pub attitude: Attitude,

    pub angular_rate: AngularRate,

    pub position: Position,

    pub altitude: AltitudeReading,

    pub chute: ChuteState,

    /// Battery bus voltage in volts
    pub battery_voltage: f64,

    /// Local capture time stamped by the decoder; the payload's own time
    /// field may be skewed or absent and is never trusted for ordering
    pub received_at: DateTime<Utc>,
}

/// Battery voltage shown before the first message arrives
pub const DEFAULT_BATTERY_VOLTAGE: f64 = 12.0;

impl Snapshot {
    /// Pre-first-message defaults: idle state, nominal battery, and the map
    /// centered on the configured fallback coordinate until the first fix.
    pub fn initial(fallback: GeoPoint) -> Self {
        Self {
            id: 0,
            state: 0,
            operation_mode: 0,
            attitude: Attitude::default(),
            angular_rate: AngularRate::default(),
            position: Position {
                latitude: fallback.latitude,
                longitude: fallback.longitude,
                gps_altitude: 0.0,
                gps_time: 0.0,
            },
            altitude: AltitudeReading::default(),
            chute: ChuteState::default(),
            battery_voltage: DEFAULT_BATTERY_VOLTAGE,
            received_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}
