//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{Result, TrackerError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub broker: BrokerConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub power: PowerConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// MQTT broker connection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Topic prefix, also used as the MQTT client identifier
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Device id, second topic level
    pub client_id: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_keep_alive_s")]
    pub keep_alive_s: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Publish scheduling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_send_on_move_every_s")]
    pub send_on_move_every_s: u32,

    #[serde(default = "default_send_on_non_move_every_s")]
    pub send_on_non_move_every_s: u32,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_loop_interval_ms")]
    pub loop_interval_ms: u64,
}

/// Supply voltage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PowerConfig {
    /// Below this voltage the device runs in low-power mode
    #[serde(default = "default_low_power_voltage")]
    pub low_power_voltage: f32,

    /// Voltage divider factor applied to the raw ADC value
    #[serde(default = "default_analog_factor")]
    pub analog_factor: f32,

    #[serde(default = "default_adc_path")]
    pub adc_path: String,
}

/// Feature flags and fitted hardware
#[derive(Debug, Deserialize, Clone)]
pub struct FeatureConfig {
    #[serde(default)]
    pub deep_sleep: bool,

    #[serde(default = "default_power_on")]
    pub power_on: bool,

    #[serde(default = "default_gps_enabled")]
    pub gps_enabled: bool,

    /// Cellular modem with GPS receiver fitted
    #[serde(default)]
    pub gsm_modem: bool,
}

/// Telemetry source configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for rolling log files, stdout only when unset
    #[serde(default)]
    pub dir: Option<String>,
}

// Default value functions
fn default_port() -> u16 { 1883 }
fn default_client_name() -> String { "tracker".to_string() }
fn default_keep_alive_s() -> u64 { 60 }
fn default_connect_timeout_ms() -> u64 { 10000 }

fn default_send_on_move_every_s() -> u32 { 60 }
fn default_send_on_non_move_every_s() -> u32 { 3600 }
fn default_retry_attempts() -> u32 { 5 }
fn default_retry_backoff_ms() -> u64 { 5000 }
fn default_loop_interval_ms() -> u64 { 1000 }

fn default_low_power_voltage() -> f32 { 11.0 }
fn default_analog_factor() -> f32 { 0.03 }
fn default_adc_path() -> String { "/sys/bus/iio/devices/iio:device0/in_voltage0_raw".to_string() }

fn default_power_on() -> bool { true }
fn default_gps_enabled() -> bool { true }

fn default_snapshot_path() -> String { "/run/tracker/telemetry.json".to_string() }

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            send_on_move_every_s: default_send_on_move_every_s(),
            send_on_non_move_every_s: default_send_on_non_move_every_s(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            loop_interval_ms: default_loop_interval_ms(),
        }
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            low_power_voltage: default_low_power_voltage(),
            analog_factor: default_analog_factor(),
            adc_path: default_adc_path(),
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            deep_sleep: false,
            power_on: default_power_on(),
            gps_enabled: default_gps_enabled(),
            gsm_modem: false,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tracker_uplink::config::Config;
    ///
    /// let config = Config::load("config/tracker.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
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
        if self.broker.host.is_empty() {
            return Err(invalid("broker host cannot be empty"));
        }

        if self.broker.client_name.is_empty() || self.broker.client_id.is_empty() {
            return Err(invalid("client_name and client_id cannot be empty"));
        }

        // Topic levels must not contain separators or wildcards
        for (name, value) in [
            ("client_name", &self.broker.client_name),
            ("client_id", &self.broker.client_id),
        ] {
            if value.contains(&['/', '+', '#'][..]) {
                return Err(invalid(format!("{} must not contain '/', '+' or '#'", name)));
            }
        }

        if self.broker.port == 0 {
            return Err(invalid("broker port must be greater than 0"));
        }

        if self.broker.keep_alive_s < 5 || self.broker.keep_alive_s > 3600 {
            return Err(invalid("keep_alive_s must be between 5 and 3600"));
        }

        if self.broker.connect_timeout_ms == 0 || self.broker.connect_timeout_ms > 60000 {
            return Err(invalid("connect_timeout_ms must be between 1 and 60000"));
        }

        if self.schedule.retry_attempts == 0 || self.schedule.retry_attempts > 100 {
            return Err(invalid("retry_attempts must be between 1 and 100"));
        }

        if self.schedule.retry_backoff_ms > 600000 {
            return Err(invalid("retry_backoff_ms must be at most 600000"));
        }

        if self.schedule.loop_interval_ms == 0 || self.schedule.loop_interval_ms > 60000 {
            return Err(invalid("loop_interval_ms must be between 1 and 60000"));
        }

        if !(self.power.low_power_voltage > 0.0) {
            return Err(invalid("low_power_voltage must be greater than 0.0"));
        }

        if !(self.power.analog_factor > 0.0) {
            return Err(invalid("analog_factor must be greater than 0.0"));
        }

        if self.power.adc_path.is_empty() {
            return Err(invalid("adc_path cannot be empty"));
        }

        if self.telemetry.snapshot_path.is_empty() {
            return Err(invalid("snapshot_path cannot be empty"));
        }

        if matches!(&self.logging.dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("logging dir cannot be empty when set"));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> TrackerError {
    TrackerError::Config(toml::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            broker: BrokerConfig {
                host: "broker.local".to_string(),
                port: default_port(),
                client_name: default_client_name(),
                client_id: "unit1".to_string(),
                user: String::new(),
                password: String::new(),
                keep_alive_s: default_keep_alive_s(),
                connect_timeout_ms: default_connect_timeout_ms(),
            },
            schedule: ScheduleConfig::default(),
            power: PowerConfig::default(),
            features: FeatureConfig::default(),
            telemetry: TelemetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[broker]
host = "mqtt.example.org"
client_id = "van"
user = "tracker"
password = "secret"

[schedule]
send_on_move_every_s = 30

[features]
gsm_modem = true
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.client_name, "tracker");
        assert_eq!(config.schedule.send_on_move_every_s, 30);
        assert_eq!(config.schedule.send_on_non_move_every_s, 3600);
        assert_eq!(config.schedule.retry_attempts, 5);
        assert!(config.features.gsm_modem);
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/tracker.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.broker.client_id, "van");
        assert!(config.features.gsm_modem);
    }

    #[test]
    fn test_load_missing_broker_section() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[schedule]\nretry_attempts = 3\n").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(TrackerError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/tracker.toml");
        assert!(matches!(result, Err(TrackerError::Io(_))));
    }

    #[test]
    fn test_empty_host() {
        let mut config = create_valid_config();
        config.broker.host = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_client_id() {
        let mut config = create_valid_config();
        config.broker.client_id = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_name_with_separator() {
        let mut config = create_valid_config();
        config.broker.client_name = "a/b".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_id_with_wildcard() {
        let mut config = create_valid_config();
        config.broker.client_id = "unit#".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_port_zero() {
        let mut config = create_valid_config();
        config.broker.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_keep_alive_too_low() {
        let mut config = create_valid_config();
        config.broker.keep_alive_s = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connect_timeout_zero() {
        let mut config = create_valid_config();
        config.broker.connect_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_attempts_zero() {
        let mut config = create_valid_config();
        config.schedule.retry_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_backoff_zero_allowed() {
        let mut config = create_valid_config();
        config.schedule.retry_backoff_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_loop_interval_too_high() {
        let mut config = create_valid_config();
        config.schedule.loop_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_low_power_voltage_negative() {
        let mut config = create_valid_config();
        config.power.low_power_voltage = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_low_power_voltage_nan() {
        let mut config = create_valid_config();
        config.power.low_power_voltage = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_analog_factor_zero() {
        let mut config = create_valid_config();
        config.power.analog_factor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_logging_dir() {
        let mut config = create_valid_config();
        config.logging.dir = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_port(), 1883);
        assert_eq!(default_client_name(), "tracker");
        assert_eq!(default_keep_alive_s(), 60);
        assert_eq!(default_connect_timeout_ms(), 10000);
        assert_eq!(default_send_on_move_every_s(), 60);
        assert_eq!(default_send_on_non_move_every_s(), 3600);
        assert_eq!(default_retry_attempts(), 5);
        assert_eq!(default_retry_backoff_ms(), 5000);
        assert_eq!(default_loop_interval_ms(), 1000);
        assert_eq!(default_low_power_voltage(), 11.0);
        assert_eq!(default_analog_factor(), 0.03);
        assert!(default_power_on());
        assert!(default_gps_enabled());
    }
}
