//! # Topic Vocabulary
//!
//! Topic suffixes appended to `{client_name}/{client_id}`.

use crate::settings::Settings;

pub const TOPIC_DEEP_SLEEP: &str = "/DeepSleep";

pub const TOPIC_VOLTAGE: &str = "/Voltage";
pub const TOPIC_MAH: &str = "/mAh";
pub const TOPIC_MAH_LOW_POWER: &str = "/mAhLowPower";
pub const TOPIC_ALIVE: &str = "/Alive";

pub const TOPIC_POWER_ON: &str = "/PowerOn";
pub const TOPIC_GPS_ENABLED: &str = "/GpsEnabled";
pub const TOPIC_SEND_ON_MOVE_EVERY: &str = "/SendOnMoveEverySec";
pub const TOPIC_SEND_ON_NON_MOVE_EVERY: &str = "/SendOnNonMoveEverySec";
pub const TOPIC_SEND_EVERY: &str = "/SendEverySec";

pub const TOPIC_TEMPERATURE: &str = "/BME280/Temperature";
pub const TOPIC_HUMIDITY: &str = "/BME280/Humidity";
pub const TOPIC_PRESSURE: &str = "/BME280/Pressure";

pub const TOPIC_SIGNAL_QUALITY: &str = "/Gsm/SignalQuality";
pub const TOPIC_BATT_LEVEL: &str = "/Gsm/BattLevel";
pub const TOPIC_BATT_VOLT: &str = "/Gsm/BattVolt";

pub const TOPIC_LONGITUDE: &str = "/Gps/Longitude";
pub const TOPIC_LATITUDE: &str = "/Gps/Latitude";
pub const TOPIC_ALTITUDE: &str = "/Gps/Altitude";
pub const TOPIC_KMH: &str = "/Gps/Kmh";

/// Remote configuration commands, one per writable setting topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    DeepSleep,
    PowerOn,
    GpsEnabled,
    SendOnMoveEverySec,
    SendOnNonMoveEverySec,
    /// Single interval variant for devices without GPS, sets the non-moving interval
    SendEverySec,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::DeepSleep,
        Command::PowerOn,
        Command::GpsEnabled,
        Command::SendOnMoveEverySec,
        Command::SendOnNonMoveEverySec,
        Command::SendEverySec,
    ];

    /// Commands subscribed on every connect.
    pub const SUBSCRIBED: [Command; 5] = [
        Command::DeepSleep,
        Command::PowerOn,
        Command::GpsEnabled,
        Command::SendOnMoveEverySec,
        Command::SendOnNonMoveEverySec,
    ];

    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Command::DeepSleep => TOPIC_DEEP_SLEEP,
            Command::PowerOn => TOPIC_POWER_ON,
            Command::GpsEnabled => TOPIC_GPS_ENABLED,
            Command::SendOnMoveEverySec => TOPIC_SEND_ON_MOVE_EVERY,
            Command::SendOnNonMoveEverySec => TOPIC_SEND_ON_NON_MOVE_EVERY,
            Command::SendEverySec => TOPIC_SEND_EVERY,
        }
    }

    /// Commands whose current values are republished on the initial send.
    ///
    /// Devices with the cellular modem expose the GPS switch and both
    /// intervals, the others a single send interval.
    #[must_use]
    pub fn republished(gsm_modem: bool) -> &'static [Command] {
        static WITH_MODEM: [Command; 5] = Command::SUBSCRIBED;
        static WITHOUT_MODEM: [Command; 3] =
            [Command::DeepSleep, Command::PowerOn, Command::SendEverySec];

        if gsm_modem {
            &WITH_MODEM[..]
        } else {
            &WITHOUT_MODEM[..]
        }
    }

    /// Commands to subscribe to for the given hardware variant.
    #[must_use]
    pub fn subscriptions(gsm_modem: bool) -> Vec<Command> {
        let mut commands = Command::SUBSCRIBED.to_vec();
        if !gsm_modem {
            commands.push(Command::SendEverySec);
        }
        commands
    }

    /// Current value of the setting, in its wire format.
    #[must_use]
    pub fn current_value(self, settings: &Settings) -> i64 {
        match self {
            Command::DeepSleep => i64::from(settings.deep_sleep_enabled),
            Command::PowerOn => i64::from(settings.power_on),
            Command::GpsEnabled => i64::from(settings.gps_enabled),
            Command::SendOnMoveEverySec => i64::from(settings.send_on_move_every_sec),
            Command::SendOnNonMoveEverySec | Command::SendEverySec => {
                i64::from(settings.send_on_non_move_every_sec)
            }
        }
    }

    /// Writes `value` into the setting. Flags are set for any non-zero
    /// value, intervals saturate to the `u32` range.
    pub fn apply(self, settings: &mut Settings, value: i64) {
        let seconds = u32::try_from(value.max(0)).unwrap_or(u32::MAX);
        match self {
            Command::DeepSleep => settings.deep_sleep_enabled = value != 0,
            Command::PowerOn => settings.power_on = value != 0,
            Command::GpsEnabled => settings.gps_enabled = value != 0,
            Command::SendOnMoveEverySec => settings.send_on_move_every_sec = seconds,
            Command::SendOnNonMoveEverySec | Command::SendEverySec => {
                settings.send_on_non_move_every_sec = seconds
            }
        }
    }
}
