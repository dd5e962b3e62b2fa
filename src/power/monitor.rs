//! # Voltage Monitor
//!
//! Classifies the supply into low-power or high-power mode and accounts the
//! time spent in low-power mode.
//!
//! The mode boundary is a single threshold without hysteresis band. A
//! voltage hovering around the threshold flips the mode on every sample and
//! the dwell time is accumulated in many small pieces.

use tracing::{info, warn};

use super::sampler::VoltageSampler;
use crate::error::Result;
use crate::settings::Settings;
use crate::state::TelemetryState;

/// Operating mode derived from the supply voltage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerMode {
    #[default]
    HighPower,
    LowPower,
}

impl PowerMode {
    /// Mode for voltage `volts` against `threshold`.
    #[must_use]
    pub fn classify(volts: f32, threshold: f32) -> Self {
        if volts < threshold {
            PowerMode::LowPower
        } else {
            PowerMode::HighPower
        }
    }

    #[must_use]
    pub fn is_low_power(self) -> bool {
        self == PowerMode::LowPower
    }
}

/// Supply voltage reader and low-power dwell accounting.
pub struct VoltageMonitor<S> {
    sampler: S,
    /// Voltage divider factor, volts per ADC count
    analog_factor: f32,
    mode: PowerMode,
    /// Seconds since power-on at which low-power mode was entered
    low_power_start_sec: u64,
}

impl<S: VoltageSampler> VoltageMonitor<S> {
    pub fn new(sampler: S, analog_factor: f32) -> Self {
        Self {
            sampler,
            analog_factor,
            mode: PowerMode::HighPower,
            low_power_start_sec: 0,
        }
    }

    #[must_use]
    pub fn mode(&self) -> PowerMode {
        self.mode
    }

    /// Takes the first sample and sets the initial mode without touching
    /// the dwell counters.
    ///
    /// # Errors
    ///
    /// Returns error if the ADC cannot be read
    pub fn begin(&mut self, now: u64, settings: &Settings, state: &mut TelemetryState) -> Result<PowerMode> {
        let volts = self.read_volts()?;
        self.mode = PowerMode::classify(volts, settings.power_save_mode_voltage);
        self.low_power_start_sec = now;

        state.voltage = volts;
        state.is_low_power = self.mode.is_low_power();
        info!("Supply voltage {:.2} V, starting in {:?}", volts, self.mode);
        Ok(self.mode)
    }

    /// Samples the voltage and updates mode and dwell counters.
    ///
    /// Dwell time is attributed only when leaving low-power mode. A failed
    /// read keeps the previous mode.
    pub fn sample(&mut self, now: u64, settings: &Settings, state: &mut TelemetryState) -> PowerMode {
        let volts = match self.read_volts() {
            Ok(volts) => volts,
            Err(e) => {
                warn!("Failed to read supply voltage: {}", e);
                return self.mode;
            }
        };
        state.voltage = volts;

        let mode = PowerMode::classify(volts, settings.power_save_mode_voltage);
        match (self.mode, mode) {
            (PowerMode::LowPower, PowerMode::HighPower) => {
                let dwell = now.saturating_sub(self.low_power_start_sec);
                state.low_power_active_time_sec += dwell;
                if settings.power_on {
                    state.low_power_power_on_time_sec += dwell;
                }
                info!("Change to high power ({:.1} V) after {} s", volts, dwell);
            }
            (PowerMode::HighPower, PowerMode::LowPower) => {
                self.low_power_start_sec = now;
                info!("Change to low power ({:.1} V)", volts);
            }
            _ => {}
        }

        self.mode = mode;
        state.is_low_power = mode.is_low_power();
        mode
    }

    fn read_volts(&mut self) -> Result<f32> {
        let raw = self.sampler.read_raw()?;
        Ok(raw as f32 * self.analog_factor)
    }
}
