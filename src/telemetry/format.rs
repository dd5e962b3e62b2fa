//! # Payload Formatting
//!
//! Text encodings of telemetry values as published on MQTT topics.

use crate::state::GpsFix;

/// Fractional digits for decimal readings
pub const DECIMAL_PRECISION: usize = 2;

/// Formats a decimal reading with [`DECIMAL_PRECISION`] fractional digits.
///
/// # Examples
///
/// ```
/// use tracker_uplink::telemetry::format::decimal;
///
/// assert_eq!(decimal(12.345), "12.35");
/// assert_eq!(decimal(3.0), "3.00");
/// ```
#[must_use]
pub fn decimal(value: f32) -> String {
    format!("{:.*}", DECIMAL_PRECISION, value)
}

/// Formats 0/1 command flags.
#[must_use]
pub fn flag(value: bool) -> String {
    u8::from(value).to_string()
}

/// Human readable duration: `"1d 02:03:04"`, day part omitted when zero.
///
/// # Examples
///
/// ```
/// use tracker_uplink::telemetry::format::format_interval;
///
/// assert_eq!(format_interval(59), "00:00:59");
/// assert_eq!(format_interval(93784), "1d 02:03:04");
/// ```
#[must_use]
pub fn format_interval(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;

    if days > 0 {
        format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

impl GpsFix {
    #[must_use]
    pub fn longitude_string(&self) -> String {
        format!("{:.6}", self.longitude)
    }

    #[must_use]
    pub fn latitude_string(&self) -> String {
        format!("{:.6}", self.latitude)
    }

    #[must_use]
    pub fn altitude_string(&self) -> String {
        format!("{:.1}", self.altitude)
    }

    #[must_use]
    pub fn kmph_string(&self) -> String {
        format!("{:.1}", self.kmph)
    }
}
