//! # Power Module
//!
//! Supply voltage sampling and low-power mode tracking.
//!
//! This module handles:
//! - Reading the raw ADC value of the supply voltage divider
//! - Classifying low-power / high-power mode against a threshold
//! - Accumulating time spent in low-power mode

pub mod monitor;
pub mod sampler;

pub use monitor::{PowerMode, VoltageMonitor};
pub use sampler::{SysfsAdc, VoltageSampler};
