//! # MQTT Module
//!
//! Telemetry publication and remote configuration over MQTT.
//!
//! This module handles:
//! - Deciding when a publish round is due
//! - Connecting with bounded, non-blocking retries
//! - Publishing retained telemetry values under `{name}/{id}/...`
//! - Applying configuration commands received on subscribed topics

pub mod client;
pub mod commands;
pub mod scheduler;
pub mod topics;
pub mod transport;

pub use client::MqttTransport;
pub use scheduler::{PublishScheduler, RetryPolicy, TickOutcome};
pub use transport::{Credentials, InboundMessage, Transport};
