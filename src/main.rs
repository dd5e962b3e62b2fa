//! # Tracker Uplink
//!
//! Reports supply voltage, power consumption, environment and position of a
//! battery-powered tracker to an MQTT broker and accepts remote
//! configuration commands.

use anyhow::{Context, Result};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use tracker_uplink::clock::MonotonicClock;
use tracker_uplink::config::{Config, LoggingConfig};
use tracker_uplink::mqtt::{MqttTransport, PublishScheduler, RetryPolicy, TickOutcome};
use tracker_uplink::power::{SysfsAdc, VoltageMonitor, VoltageSampler};
use tracker_uplink::settings::Settings;
use tracker_uplink::telemetry::SnapshotFileSource;
use tracker_uplink::tracker::Tracker;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "/etc/tracker-uplink/tracker.toml";

/// Log file name prefix inside the configured log directory
const LOG_FILE_PREFIX: &str = "tracker-uplink.log";

/// Main entry point for Tracker Uplink
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument or [`DEFAULT_CONFIG_PATH`])
///    - Set up logging to stdout or a daily log file
///    - Take the initial supply voltage sample
///
/// 2. **Main Loop**
///    - Sample voltage, refresh readings and tick the publish scheduler
///      every `loop_interval_ms`
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or the supply
/// voltage cannot be read at startup
#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path(std::env::args());
    let config = Config::load(&path).with_context(|| format!("Failed to load {}", path))?;

    let _log_guard = init_logging(&config.logging);
    info!("Tracker Uplink v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", path);

    let settings = Settings::from_config(&config);
    let sampler: Box<dyn VoltageSampler> = Box::new(SysfsAdc::new(&config.power.adc_path));
    let monitor = VoltageMonitor::new(sampler, config.power.analog_factor);
    let scheduler = PublishScheduler::new(
        MqttTransport::from_config(&config.broker),
        RetryPolicy::from_config(&config.schedule),
        &settings,
    );
    let source = SnapshotFileSource::new(&config.telemetry.snapshot_path);

    let mut tracker = Tracker::new(
        settings,
        monitor,
        scheduler,
        Box::new(source),
        Box::new(MonotonicClock::new()),
    );
    tracker.begin().context("Failed to read supply voltage")?;

    let mut loop_interval = interval(Duration::from_millis(config.schedule.loop_interval_ms));
    loop_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Publishing to {}:{}", config.broker.host, config.broker.port);
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = loop_interval.tick() => {
                match tracker.step().await {
                    TickOutcome::Published => {
                        debug!("Round {} complete", tracker.state().mqtt_send_count);
                    }
                    TickOutcome::Abandoned => warn!("Broker unreachable, next try on the next interval"),
                    TickOutcome::Idle | TickOutcome::Connecting => {}
                }

                if tracker.settings().deep_sleep_enabled && !tracker.should_wait_before_next_action() {
                    debug!("Nothing pending, deep sleep possible");
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total publish rounds: {}", tracker.state().mqtt_send_count);
                break;
            }
        }
    }

    Ok(())
}

/// Config path from the first command line argument.
fn config_path(mut args: impl Iterator<Item = String>) -> String {
    args.nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// Installs the tracing subscriber. The returned guard flushes the log
/// file writer and must be kept alive.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_from_args() {
        let args = vec!["tracker-uplink".to_string(), "/tmp/tracker.toml".to_string()];
        assert_eq!(config_path(args.into_iter()), "/tmp/tracker.toml");
    }

    #[test]
    fn test_config_path_default() {
        let args = vec!["tracker-uplink".to_string()];
        assert_eq!(config_path(args.into_iter()), DEFAULT_CONFIG_PATH);
    }
}
