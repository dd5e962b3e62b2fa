//! # Telemetry State
//!
//! Counters, timestamps and the latest sensor readings. Created once at
//! startup and updated in place by the voltage monitor, the telemetry
//! source and the publish scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Environmental sensor (BME280) reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Degrees Celsius
    pub temperature: f32,
    /// Relative humidity in percent
    pub humidity: f32,
    /// Hectopascal
    pub pressure: f32,
}

/// Cellular modem status as reported by the modem, passed through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemStatus {
    pub signal_quality: String,
    pub battery_level: String,
    pub battery_volt: String,
}

/// Last GPS fix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsFix {
    /// True when the receiver reported a valid fix
    pub fix_status: bool,
    pub longitude: f64,
    pub latitude: f64,
    /// Meters
    pub altitude: f64,
    pub kmph: f64,
    pub time: Option<DateTime<Utc>>,
}

/// Power consumption estimates in mAh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConsumption {
    pub mah: f32,
    pub mah_low_power: f32,
}

/// Readings provided by the external data sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Readings {
    pub is_moving: bool,
    pub environment: Option<Environment>,
    pub modem: ModemStatus,
    pub gps: GpsFix,
    pub consumption: PowerConsumption,
    /// Active seconds accumulated before the current power-on
    pub active_offset_sec: u64,
}

/// State the scheduler and the voltage monitor work on.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryState {
    /// Seconds since power-on of the last completed publish round
    pub last_mqtt_send_sec: u64,
    /// Publish once regardless of the interval (set at startup)
    pub mqtt_init_send: bool,
    pub mqtt_send_count: u32,
    /// GPS time of the last completed publish round
    pub mqtt_last_sent_time: Option<DateTime<Utc>>,

    pub voltage: f32,
    pub is_low_power: bool,
    /// Seconds spent in low-power mode
    pub low_power_active_time_sec: u64,
    /// Seconds spent in low-power mode while powered on
    pub low_power_power_on_time_sec: u64,

    pub readings: Readings,
}

impl Default for TelemetryState {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_mqtt_send_sec: 0,
            mqtt_init_send: true,
            mqtt_send_count: 0,
            mqtt_last_sent_time: None,
            voltage: 0.0,
            is_low_power: false,
            low_power_active_time_sec: 0,
            low_power_power_on_time_sec: 0,
            readings: Readings::default(),
        }
    }

    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.readings.is_moving
    }

    /// Total active seconds including time before the current power-on.
    #[must_use]
    pub fn active_time_sec(&self, now: u64) -> u64 {
        self.readings.active_offset_sec.saturating_add(now)
    }
}
