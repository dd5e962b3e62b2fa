//! # Publish Scheduler
//!
//! Decides when telemetry is sent, keeps the broker connection alive and
//! publishes one complete round of telemetry values when due.
//!
//! ## Scheduling
//!
//! A round is due when the seconds elapsed since the last completed round
//! reach the send interval for the current moving state. The first round
//! after startup is sent regardless of the interval.
//!
//! ## Connection recovery
//!
//! Connection attempts are spread over successive ticks instead of sleeping:
//! after a failed attempt the next one is made no earlier than the retry
//! backoff. After [`RetryPolicy::max_attempts`] failures the round is
//! abandoned and a new one starts on the next due tick.
//!
//! ## Publishing
//!
//! Every value is published with the retain flag at QoS 0. Empty values are
//! skipped. A failed publish is logged and the round carries on.

use tracing::{debug, info, warn};

use super::commands::CommandTable;
use super::topics::*;
use super::transport::{Credentials, Transport};
use crate::config::ScheduleConfig;
use crate::settings::Settings;
use crate::state::TelemetryState;
use crate::telemetry::format::{decimal, format_interval};

/// Bounded connection retry per publish round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed attempts after which the round is abandoned
    pub max_attempts: u32,
    /// Minimum seconds between two attempts
    pub backoff_sec: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_sec: 5,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts,
            backoff_sec: config.retry_backoff_ms.div_ceil(1000),
        }
    }
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing due
    Idle,
    /// Round open, waiting for the next connection attempt
    Connecting,
    /// Connection retries exhausted, round dropped
    Abandoned,
    /// Round completed
    Published,
}

/// Publish scheduling and connection recovery.
pub struct PublishScheduler<T> {
    transport: T,
    retry: RetryPolicy,
    commands: CommandTable,
    publish_in_progress: bool,
    /// Failed connection attempts in the current round
    failed_attempts: u32,
    /// Earliest time of the next connection attempt
    next_attempt_sec: u64,
}

impl<T: Transport> PublishScheduler<T> {
    pub fn new(transport: T, retry: RetryPolicy, settings: &Settings) -> Self {
        debug!("MQTT scheduler for {}:{}", settings.mqtt_server, settings.mqtt_port);
        Self {
            transport,
            retry,
            commands: CommandTable::new(settings),
            publish_in_progress: false,
            failed_attempts: 0,
            next_attempt_sec: 0,
        }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn is_publish_in_progress(&self) -> bool {
        self.publish_in_progress
    }

    /// True when the send interval for the current moving state has elapsed.
    #[must_use]
    pub fn is_due(now: u64, settings: &Settings, state: &TelemetryState) -> bool {
        let interval = u64::from(settings.send_interval_sec(state.is_moving()));
        now.saturating_sub(state.last_mqtt_send_sec) >= interval
    }

    /// True while a round is in progress or the next one is not yet due.
    ///
    /// Callers use this to hold off other time-sensitive work such as
    /// entering deep sleep.
    #[must_use]
    pub fn should_wait_before_next_action(&self, now: u64, settings: &Settings, state: &TelemetryState) -> bool {
        self.publish_in_progress || !Self::is_due(now, settings, state)
    }

    /// Applies a message received on a subscribed topic to `settings`.
    pub fn on_message(&self, topic: &str, payload: &[u8], settings: &mut Settings) -> Option<Command> {
        self.commands.dispatch(topic, payload, settings)
    }

    /// Runs one scheduling step.
    ///
    /// Never sleeps; connection backoff is tracked between calls.
    pub async fn tick(&mut self, now: u64, settings: &mut Settings, state: &mut TelemetryState) -> TickOutcome {
        self.drain_inbound(settings);

        if !self.publish_in_progress {
            if !(Self::is_due(now, settings, state) || state.mqtt_init_send) {
                return TickOutcome::Idle;
            }
            debug!("Starting MQTT publish round");
            self.publish_in_progress = true;
            self.failed_attempts = 0;
        }

        while !self.transport.is_connected() {
            if now < self.next_attempt_sec {
                return TickOutcome::Connecting;
            }
            if self.connect(settings).await {
                break;
            }

            self.failed_attempts += 1;
            self.next_attempt_sec = now + self.retry.backoff_sec;
            if self.failed_attempts >= self.retry.max_attempts {
                warn!(
                    "MQTT connection failed {} times, deferring to next interval",
                    self.failed_attempts
                );
                self.publish_in_progress = false;
                self.failed_attempts = 0;
                return TickOutcome::Abandoned;
            }
            debug!("Try again in {} seconds", self.retry.backoff_sec);
        }

        self.publish_round(now, settings, state).await;
        self.publish_in_progress = false;
        self.failed_attempts = 0;
        TickOutcome::Published
    }

    fn drain_inbound(&mut self, settings: &mut Settings) {
        while let Some(message) = self.transport.poll_message() {
            self.commands.dispatch(&message.topic, &message.payload, settings);
        }
    }

    /// One connection attempt, subscribing to the command topics on success.
    async fn connect(&mut self, settings: &Settings) -> bool {
        info!("Attempting MQTT connection...");
        let credentials = Credentials {
            client_id: &settings.mqtt_name,
            user: &settings.mqtt_user,
            password: &settings.mqtt_password,
        };
        if let Err(e) = self.transport.connect(&credentials).await {
            warn!("MQTT connection failed: {}", e);
            return false;
        }

        self.commands = CommandTable::new(settings);
        for command in Command::subscriptions(settings.gsm_modem) {
            let topic = settings.topic(command.suffix());
            debug!("MQTT subscribe: [{}]", topic);
            if let Err(e) = self.transport.subscribe(&topic).await {
                warn!("Failed to subscribe to {}: {}", topic, e);
            }
        }
        true
    }

    async fn publish_round(&mut self, now: u64, settings: &Settings, state: &mut TelemetryState) {
        let mut published = 0;

        if state.mqtt_init_send {
            for &command in Command::republished(settings.gsm_modem) {
                let value = command.current_value(settings).to_string();
                published += usize::from(self.publish_value(settings, command.suffix(), &value).await);
            }
            state.mqtt_init_send = false;
        }

        for (suffix, value) in telemetry_fields(now, settings, state) {
            published += usize::from(self.publish_value(settings, suffix, &value).await);
        }

        state.mqtt_send_count += 1;
        state.mqtt_last_sent_time = state.readings.gps.time;
        state.last_mqtt_send_sec = now;
        info!("MQTT published {} values (round {})", published, state.mqtt_send_count);
    }

    /// Publishes a retained value, skipping empty ones. Returns true on success.
    async fn publish_value(&mut self, settings: &Settings, suffix: &str, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }

        let topic = settings.topic(suffix);
        debug!("MQTT publish: [{}]=[{}]", topic, value);
        match self.transport.publish(&topic, value, true).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to publish {}: {}", topic, e);
                false
            }
        }
    }
}

/// Telemetry values of one round as `(suffix, value)` pairs.
///
/// Modem values are included only when the modem is fitted, GPS values only
/// when additionally the last fix is valid.
#[must_use]
pub fn telemetry_fields(now: u64, settings: &Settings, state: &TelemetryState) -> Vec<(&'static str, String)> {
    let readings = &state.readings;
    let mut fields = vec![
        (TOPIC_VOLTAGE, decimal(state.voltage)),
        (TOPIC_MAH, decimal(readings.consumption.mah)),
        (TOPIC_MAH_LOW_POWER, decimal(readings.consumption.mah_low_power)),
        (TOPIC_ALIVE, format_interval(state.active_time_sec(now))),
    ];

    if let Some(env) = readings.environment {
        fields.push((TOPIC_TEMPERATURE, decimal(env.temperature)));
        fields.push((TOPIC_HUMIDITY, decimal(env.humidity)));
        fields.push((TOPIC_PRESSURE, decimal(env.pressure)));
    }

    if settings.gsm_modem {
        fields.push((TOPIC_SIGNAL_QUALITY, readings.modem.signal_quality.clone()));
        fields.push((TOPIC_BATT_LEVEL, readings.modem.battery_level.clone()));
        fields.push((TOPIC_BATT_VOLT, readings.modem.battery_volt.clone()));

        let gps = &readings.gps;
        if gps.fix_status {
            fields.push((TOPIC_LONGITUDE, gps.longitude_string()));
            fields.push((TOPIC_LATITUDE, gps.latitude_string()));
            fields.push((TOPIC_ALTITUDE, gps.altitude_string()));
            fields.push((TOPIC_KMH, gps.kmph_string()));
        }
    }

    fields
}
