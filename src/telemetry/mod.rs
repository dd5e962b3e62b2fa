//! # Telemetry Module
//!
//! Data sources feeding the publish step and the text formats used on the
//! wire.
//!
//! This module handles:
//! - Reading GPS, modem and environment readings from the sensor daemons
//! - Fixed-precision decimal formatting
//! - Human readable alive time

pub mod format;
pub mod source;

pub use source::{SnapshotFileSource, TelemetrySource};
