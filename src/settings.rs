//! # Runtime Settings
//!
//! Mutable device settings. Built once from [`Config`] at startup and
//! afterwards changed only by remote commands received over MQTT.

use crate::config::Config;

/// Settings shared between the voltage monitor (reader) and the publish
/// scheduler (the only writer).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub mqtt_server: String,
    pub mqtt_port: u16,
    /// First topic level, also used as MQTT client identifier
    pub mqtt_name: String,
    /// Second topic level
    pub mqtt_id: String,
    pub mqtt_user: String,
    pub mqtt_password: String,

    pub send_on_move_every_sec: u32,
    pub send_on_non_move_every_sec: u32,

    /// Low-power mode threshold in volts
    pub power_save_mode_voltage: f32,

    pub deep_sleep_enabled: bool,
    pub power_on: bool,
    pub gps_enabled: bool,
    /// Cellular modem and GPS receiver fitted
    pub gsm_modem: bool,
}

impl Settings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            mqtt_server: config.broker.host.clone(),
            mqtt_port: config.broker.port,
            mqtt_name: config.broker.client_name.clone(),
            mqtt_id: config.broker.client_id.clone(),
            mqtt_user: config.broker.user.clone(),
            mqtt_password: config.broker.password.clone(),
            send_on_move_every_sec: config.schedule.send_on_move_every_s,
            send_on_non_move_every_sec: config.schedule.send_on_non_move_every_s,
            power_save_mode_voltage: config.power.low_power_voltage,
            deep_sleep_enabled: config.features.deep_sleep,
            power_on: config.features.power_on,
            gps_enabled: config.features.gps_enabled,
            gsm_modem: config.features.gsm_modem,
        }
    }

    /// Send interval in seconds for the given moving state.
    #[must_use]
    pub fn send_interval_sec(&self, is_moving: bool) -> u32 {
        if is_moving {
            self.send_on_move_every_sec
        } else {
            self.send_on_non_move_every_sec
        }
    }

    /// Full topic for a suffix: `{name}/{id}{suffix}`.
    #[must_use]
    pub fn topic(&self, suffix: &str) -> String {
        format!("{}/{}{}", self.mqtt_name, self.mqtt_id, suffix)
    }
}

#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    Settings {
        mqtt_server: "broker.local".to_string(),
        mqtt_port: 1883,
        mqtt_name: "tracker".to_string(),
        mqtt_id: "unit1".to_string(),
        mqtt_user: "user".to_string(),
        mqtt_password: "pass".to_string(),
        send_on_move_every_sec: 5,
        send_on_non_move_every_sec: 60,
        power_save_mode_voltage: 3.3,
        deep_sleep_enabled: false,
        power_on: true,
        gps_enabled: true,
        gsm_modem: true,
    }
}
