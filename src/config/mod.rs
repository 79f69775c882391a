//! Process configuration, loaded from `wwpumpe.toml`.
//!
//! Every field has a `#[serde(default)]`-backed default so an operator's
//! config file can omit anything they don't want to override, and
//! `serde_with`'s `DurationSeconds` keeps the gate constants readable as
//! plain seconds in TOML while giving us `Duration` in Rust.

use log::error;
use serde::Deserialize;
use serde_with::serde_as;
use serde_with::DurationSeconds;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[serde_as]
#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub gpio: GpioConfig,
    pub pump: PumpConfig,
    pub detector: DetectorConfig,
    pub timetable: TimetableConfig,
    #[serde_as(as = "DurationSeconds")]
    pub tick_interval: Duration,
    /// Append-only log written on backup-button press. `None` disables
    /// the file sink and leaves only the stdout tracing subscriber.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gpio: GpioConfig::default(),
            pump: PumpConfig::default(),
            detector: DetectorConfig::default(),
            timetable: TimetableConfig::default(),
            tick_interval: Duration::from_millis(1000),
            log_file: Some(PathBuf::from("wwpumpe.log")),
        }
    }
}

/// GPIO pin assignments. Defaults match the reference board.
#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GpioConfig {
    pub neopixel_pin: usize,
    pub onboard_led_pin: usize,
    pub ds18b20_pin: usize,
    pub pump_relay_pin: usize,
    pub pump_relay_active_low: bool,
    pub button_pin: usize,
}

impl Default for GpioConfig {
    fn default() -> Self {
        GpioConfig {
            neopixel_pin: 23,
            onboard_led_pin: 25,
            ds18b20_pin: 22,
            pump_relay_pin: 20,
            pump_relay_active_low: true,
            button_pin: 13,
        }
    }
}

/// Gate constants for `PumpController`.
#[serde_as]
#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PumpConfig {
    #[serde_as(as = "DurationSeconds")]
    pub waiting_time: Duration,
    #[serde_as(as = "DurationSeconds")]
    pub running_time: Duration,
    #[serde_as(as = "DurationSeconds")]
    pub quiet_time: Duration,
    #[serde_as(as = "DurationSeconds")]
    pub holiday_time: Duration,
    #[serde_as(as = "DurationSeconds")]
    pub desinfect_time: Duration,
    /// `scheduled_run`'s `slot_buffer` lead-in.
    #[serde_as(as = "DurationSeconds")]
    pub slot_buffer: Duration,
}

impl Default for PumpConfig {
    fn default() -> Self {
        PumpConfig {
            waiting_time: Duration::from_secs(900),
            running_time: Duration::from_secs(40),
            quiet_time: Duration::from_secs(60),
            holiday_time: Duration::from_secs(86400),
            desinfect_time: Duration::from_secs(259200),
            slot_buffer: Duration::from_secs(2),
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    pub rise_threshold_c: f32,
    pub history_len: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            rise_threshold_c: 0.12,
            history_len: 5,
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TimetableConfig {
    pub slot_size_min: u8,
    pub file: PathBuf,
}

impl Default for TimetableConfig {
    fn default() -> Self {
        TimetableConfig {
            slot_size_min: 15,
            file: PathBuf::from("timetable"),
        }
    }
}

impl TimetableConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.slot_size_min == 0 || 60 % self.slot_size_min != 0 {
            return Err(format!(
                "slot_size_min ({}) must divide 60",
                self.slot_size_min
            ));
        }
        Ok(())
    }
}

const CONFIG_FILE: &str = "wwpumpe.toml";

pub fn try_read_config() -> Option<Config> {
    try_read_config_file(CONFIG_FILE)
}

pub fn try_read_config_file(path: impl AsRef<Path>) -> Option<Config> {
    let path = path.as_ref();
    let contents = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to read config file {:?}: {}", path, e);
            return None;
        }
    };
    match toml::from_str(&contents) {
        Ok(config) => Some(config),
        Err(e) => {
            error!("Failed to deserialize config file {:?}: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_divisible_slot_size() {
        assert!(Config::default().timetable.validate().is_ok());
    }

    #[test]
    fn rejects_slot_size_not_dividing_hour() {
        let mut cfg = TimetableConfig::default();
        cfg.slot_size_min = 7;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parses_minimal_toml_with_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parses_partial_override() {
        let toml_str = r#"
            [pump]
            waiting_time = 120
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pump.waiting_time, Duration::from_secs(120));
        assert_eq!(config.pump.running_time, Duration::from_secs(40));
    }
}
