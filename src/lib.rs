//! # Tracker Uplink Library
//!
//! Publish scheduling and supply-voltage monitoring for a battery-powered
//! GPS tracker that reports to an MQTT broker.
//!
//! This library provides the core functionality for deciding when telemetry
//! is sent, recovering the broker connection over a lossy link, applying
//! remote configuration commands, and tracking low-power operation.

pub mod clock;
pub mod config;
pub mod error;
pub mod mqtt;
pub mod power;
pub mod settings;
pub mod state;
pub mod telemetry;
pub mod tracker;
