//! # Inbound Commands
//!
//! Dispatch of messages received on subscribed topics to the settings they
//! control.
//!
//! Payloads are parsed permissively: anything that is not a number reads as
//! `0`, like C `atoi`. Empty payloads and payloads longer than
//! [`MAX_PAYLOAD_LEN`] are dropped.

use std::collections::HashMap;

use tracing::{debug, info};

use super::topics::Command;
use crate::settings::Settings;

/// Largest accepted inbound payload in bytes
pub const MAX_PAYLOAD_LEN: usize = 200;

/// Maps full topics (`{name}/{id}{suffix}`) to commands.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    routes: HashMap<String, Command>,
}

impl CommandTable {
    /// Builds the table for the topic prefix in `settings`.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let routes = Command::ALL
            .iter()
            .map(|&command| (settings.topic(command.suffix()), command))
            .collect();
        Self { routes }
    }

    #[must_use]
    pub fn lookup(&self, topic: &str) -> Option<Command> {
        self.routes.get(topic).copied()
    }

    /// Applies an inbound message to `settings`.
    ///
    /// Returns the command that was applied, `None` when the message was
    /// dropped or the topic is unknown.
    pub fn dispatch(&self, topic: &str, payload: &[u8], settings: &mut Settings) -> Option<Command> {
        if payload.is_empty() || payload.len() > MAX_PAYLOAD_LEN {
            debug!("Dropping message on {} ({} bytes)", topic, payload.len());
            return None;
        }

        let Some(command) = self.lookup(topic) else {
            debug!("Ignoring message on unknown topic {}", topic);
            return None;
        };

        let value = parse_int(payload);
        command.apply(settings, value);
        info!("Message arrived [{}]: {:?} = {}", topic, command, value);
        Some(command)
    }
}

/// Parses a leading decimal integer, `atoi` style.
///
/// Skips leading whitespace, accepts one optional sign, then reads digits up
/// to the first non-digit. No digits yields `0`; overflow saturates.
///
/// # Examples
///
/// ```
/// use tracker_uplink::mqtt::commands::parse_int;
///
/// assert_eq!(parse_int(b"  42abc"), 42);
/// assert_eq!(parse_int(b"-7"), -7);
/// assert_eq!(parse_int(b"on"), 0);
/// ```
#[must_use]
pub fn parse_int(payload: &[u8]) -> i64 {
    let mut bytes = payload
        .iter()
        .copied()
        .skip_while(u8::is_ascii_whitespace)
        .peekable();

    let negative = match bytes.peek() {
        Some(b'-') => {
            bytes.next();
            true
        }
        Some(b'+') => {
            bytes.next();
            false
        }
        _ => false,
    };

    let magnitude = bytes
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, digit| acc.saturating_mul(10).saturating_add(i64::from(digit - b'0')));

    if negative {
        -magnitude
    } else {
        magnitude
    }
}
