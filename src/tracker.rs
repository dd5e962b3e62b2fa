//! # Tracker
//!
//! One control loop cycle: sample the supply voltage, refresh the sensor
//! readings, then give the publish scheduler its tick.
//!
//! The tracker owns the settings and the telemetry state and lends them to
//! the components for the duration of each call. The voltage monitor only
//! reads the settings; the scheduler is their single writer.

use tracing::warn;

use crate::clock::Clock;
use crate::error::Result;
use crate::mqtt::{PublishScheduler, TickOutcome, Transport};
use crate::power::{PowerMode, VoltageMonitor, VoltageSampler};
use crate::settings::Settings;
use crate::state::TelemetryState;
use crate::telemetry::TelemetrySource;

/// Device control loop
pub struct Tracker<T> {
    settings: Settings,
    state: TelemetryState,
    monitor: VoltageMonitor<Box<dyn VoltageSampler>>,
    scheduler: PublishScheduler<T>,
    source: Box<dyn TelemetrySource>,
    clock: Box<dyn Clock>,
}

impl<T: Transport> Tracker<T> {
    pub fn new(
        settings: Settings,
        monitor: VoltageMonitor<Box<dyn VoltageSampler>>,
        scheduler: PublishScheduler<T>,
        source: Box<dyn TelemetrySource>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            state: TelemetryState::new(),
            monitor,
            scheduler,
            source,
            clock,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn state(&self) -> &TelemetryState {
        &self.state
    }

    #[must_use]
    pub fn power_mode(&self) -> PowerMode {
        self.monitor.mode()
    }

    #[must_use]
    pub fn scheduler(&self) -> &PublishScheduler<T> {
        &self.scheduler
    }

    /// Takes the initial voltage sample and readings.
    ///
    /// # Errors
    ///
    /// Returns error if the supply voltage cannot be read
    pub fn begin(&mut self) -> Result<()> {
        let now = self.clock.now_secs();
        self.monitor.begin(now, &self.settings, &mut self.state)?;
        self.refresh_readings();
        Ok(())
    }

    /// Runs one cycle of the control loop.
    pub async fn step(&mut self) -> TickOutcome {
        let now = self.clock.now_secs();
        self.monitor.sample(now, &self.settings, &mut self.state);
        self.refresh_readings();
        self.scheduler.tick(now, &mut self.settings, &mut self.state).await
    }

    /// See [`PublishScheduler::should_wait_before_next_action`].
    #[must_use]
    pub fn should_wait_before_next_action(&self) -> bool {
        self.scheduler
            .should_wait_before_next_action(self.clock.now_secs(), &self.settings, &self.state)
    }

    fn refresh_readings(&mut self) {
        match self.source.read() {
            Ok(readings) => self.state.readings = readings,
            Err(e) => warn!("Keeping previous readings: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::TrackerError;
    use crate::mqtt::transport::mocks::MockTransport;
    use crate::mqtt::RetryPolicy;
    use crate::power::sampler::MockVoltageSampler;
    use crate::settings::test_settings;
    use crate::state::Readings;
    use crate::telemetry::source::MockTelemetrySource;
    use std::sync::{Arc, Mutex};

    struct Harness {
        tracker: Tracker<MockTransport>,
        transport: MockTransport,
        clock: ManualClock,
        /// Raw ADC value returned by the next sample (0.01 V per count)
        raw: Arc<Mutex<u32>>,
        moving: Arc<Mutex<bool>>,
    }

    fn harness() -> Harness {
        let raw = Arc::new(Mutex::new(350));
        let moving = Arc::new(Mutex::new(false));

        let mut sampler = MockVoltageSampler::new();
        let adc = Arc::clone(&raw);
        sampler.expect_read_raw().returning(move || Ok(*adc.lock().unwrap()));

        let mut source = MockTelemetrySource::new();
        let is_moving = Arc::clone(&moving);
        source.expect_read().returning(move || {
            Ok(Readings {
                is_moving: *is_moving.lock().unwrap(),
                ..Readings::default()
            })
        });

        let settings = test_settings();
        let transport = MockTransport::new();
        let clock = ManualClock::new(0);
        let scheduler = PublishScheduler::new(transport.clone(), RetryPolicy::default(), &settings);
        let tracker = Tracker::new(
            settings,
            VoltageMonitor::new(Box::new(sampler) as Box<dyn VoltageSampler>, 0.01),
            scheduler,
            Box::new(source),
            Box::new(clock.clone()),
        );

        Harness {
            tracker,
            transport,
            clock,
            raw,
            moving,
        }
    }

    #[tokio::test]
    async fn test_first_step_sends_initial_round() {
        let mut h = harness();
        h.tracker.begin().unwrap();

        assert_eq!(h.tracker.step().await, TickOutcome::Published);
        assert_eq!(h.tracker.state().mqtt_send_count, 1);
        assert_eq!(h.transport.value_of("tracker/unit1/Voltage").unwrap(), "3.50");
    }

    #[tokio::test]
    async fn test_steps_follow_moving_interval() {
        let mut h = harness();
        h.tracker.begin().unwrap();
        h.tracker.step().await;

        *h.moving.lock().unwrap() = true;
        h.clock.set(4);
        assert_eq!(h.tracker.step().await, TickOutcome::Idle);
        assert!(h.tracker.should_wait_before_next_action());

        h.clock.set(5);
        assert!(!h.tracker.should_wait_before_next_action());
        assert_eq!(h.tracker.step().await, TickOutcome::Published);
        assert_eq!(h.tracker.state().mqtt_send_count, 2);
    }

    #[tokio::test]
    async fn test_low_power_dwell_through_steps() {
        let mut h = harness();
        h.tracker.begin().unwrap();

        for (t, raw) in [(10, 320), (20, 310), (30, 340)] {
            h.clock.set(t);
            *h.raw.lock().unwrap() = raw;
            h.tracker.step().await;
        }

        assert_eq!(h.tracker.power_mode(), PowerMode::HighPower);
        assert_eq!(h.tracker.state().low_power_active_time_sec, 20);
        assert_eq!(h.tracker.state().low_power_power_on_time_sec, 20);
    }

    #[tokio::test]
    async fn test_power_on_command_affects_dwell_accounting() {
        let mut h = harness();
        h.tracker.begin().unwrap();
        h.tracker.step().await;

        h.transport.push_inbound("tracker/unit1/PowerOn", b"0");
        h.clock.set(1);
        *h.raw.lock().unwrap() = 300;
        h.tracker.step().await;
        assert!(!h.tracker.settings().power_on);

        h.clock.set(11);
        *h.raw.lock().unwrap() = 350;
        h.tracker.step().await;

        assert_eq!(h.tracker.state().low_power_active_time_sec, 10);
        assert_eq!(h.tracker.state().low_power_power_on_time_sec, 0);
    }

    #[test]
    fn test_source_error_keeps_readings() {
        let mut sampler = MockVoltageSampler::new();
        sampler.expect_read_raw().returning(|| Ok(350));

        let mut calls = 0;
        let mut source = MockTelemetrySource::new();
        source.expect_read().returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(Readings {
                    is_moving: true,
                    ..Readings::default()
                })
            } else {
                Err(TrackerError::Sensor("gps daemon gone".to_string()))
            }
        });

        let settings = test_settings();
        let scheduler = PublishScheduler::new(MockTransport::new(), RetryPolicy::default(), &settings);
        let mut tracker = Tracker::new(
            settings,
            VoltageMonitor::new(Box::new(sampler) as Box<dyn VoltageSampler>, 0.01),
            scheduler,
            Box::new(source),
            Box::new(ManualClock::new(0)),
        );

        tracker.begin().unwrap();
        assert!(tracker.state().is_moving());

        tokio_test::block_on(tracker.step());
        assert!(tracker.state().is_moving());
    }
}
