//! The `smart_vent:` configuration section

use serde::{Deserialize, Serialize};
use std::time::Duration;
use sv_core::EntityId;

use crate::error::{ConfigError, ConfigResult};

/// Default poll interval in seconds
pub const DEFAULT_CHECK_INTERVAL: u32 = 20;

/// Default number of automatic boosts allowed per calendar day
pub const DEFAULT_MAX_BOOSTS_PER_DAY: u32 = 5;

/// Default boost length in minutes
pub const DEFAULT_AUTO_BOOST_DURATION: u32 = 10;

/// Fan speed percentage for each ventilation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeedsConfig {
    pub low: u8,
    pub mid: u8,
    pub boost: u8,
}

impl Default for SpeedsConfig {
    fn default() -> Self {
        Self {
            low: 30,
            mid: 52,
            boost: 100,
        }
    }
}

/// Controller configuration, immutable once the controller is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartVentConfig {
    /// The fan (or dimmer) being driven
    pub fan_entity: EntityId,
    pub humidity_sensor: EntityId,
    /// First contact of the three-position switch
    pub input_0: EntityId,
    /// Second contact of the three-position switch
    pub input_1: EntityId,

    #[serde(default)]
    pub speeds: SpeedsConfig,

    /// Seconds between periodic refreshes
    #[serde(default = "default_check_interval")]
    pub check_interval: u32,

    #[serde(default = "default_max_boosts_per_day")]
    pub max_boosts_per_day: u32,

    /// Boost length in minutes, shared by automatic and forced boosts
    #[serde(default = "default_auto_boost_duration")]
    pub auto_boost_duration: u32,
}

fn default_check_interval() -> u32 {
    DEFAULT_CHECK_INTERVAL
}

fn default_max_boosts_per_day() -> u32 {
    DEFAULT_MAX_BOOSTS_PER_DAY
}

fn default_auto_boost_duration() -> u32 {
    DEFAULT_AUTO_BOOST_DURATION
}

impl SmartVentConfig {
    /// A configuration for the given entities with every optional key at its default
    pub fn new(
        fan_entity: EntityId,
        humidity_sensor: EntityId,
        input_0: EntityId,
        input_1: EntityId,
    ) -> Self {
        Self {
            fan_entity,
            humidity_sensor,
            input_0,
            input_1,
            speeds: SpeedsConfig::default(),
            check_interval: DEFAULT_CHECK_INTERVAL,
            max_boosts_per_day: DEFAULT_MAX_BOOSTS_PER_DAY,
            auto_boost_duration: DEFAULT_AUTO_BOOST_DURATION,
        }
    }

    /// Parse and validate the section from its YAML value
    pub fn from_yaml(value: serde_yaml::Value) -> ConfigResult<Self> {
        let config: Self =
            serde_yaml::from_value(value).map_err(|e| ConfigError::Section {
                section: "smart_vent".to_string(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every numeric key against its allowed range
    pub fn validate(&self) -> ConfigResult<()> {
        check_range("speeds.low", self.speeds.low.into(), 0, 100)?;
        check_range("speeds.mid", self.speeds.mid.into(), 0, 100)?;
        check_range("speeds.boost", self.speeds.boost.into(), 0, 100)?;
        check_range("check_interval", self.check_interval, 1, 3600)?;
        check_range("max_boosts_per_day", self.max_boosts_per_day, 1, 100)?;
        check_range("auto_boost_duration", self.auto_boost_duration, 1, 1440)?;
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval.into())
    }

    pub fn boost_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.auto_boost_duration.into())
    }

    /// The entities whose changes should trigger an immediate refresh
    pub fn watched_entities(&self) -> [&EntityId; 3] {
        [&self.input_0, &self.input_1, &self.humidity_sensor]
    }
}

fn check_range(key: &str, value: u32, min: u32, max: u32) -> ConfigResult<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("{} is outside the allowed range {}..={}", value, min, max),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> serde_yaml::Value {
        serde_yaml::from_str(s).unwrap()
    }

    const MINIMAL: &str = "
fan_entity: fan.bathroom
humidity_sensor: sensor.bath_humidity
input_0: binary_sensor.switch_0
input_1: binary_sensor.switch_1
";

    #[test]
    fn test_defaults_applied() {
        let config = SmartVentConfig::from_yaml(yaml(MINIMAL)).unwrap();

        assert_eq!(config.fan_entity.to_string(), "fan.bathroom");
        assert_eq!(config.speeds, SpeedsConfig { low: 30, mid: 52, boost: 100 });
        assert_eq!(config.check_interval, 20);
        assert_eq!(config.max_boosts_per_day, 5);
        assert_eq!(config.auto_boost_duration, 10);
        assert_eq!(config.check_interval(), Duration::from_secs(20));
        assert_eq!(config.boost_duration(), chrono::Duration::minutes(10));
    }

    #[test]
    fn test_explicit_values() {
        let config = SmartVentConfig::from_yaml(yaml(&format!(
            "{}speeds: {{low: 20, mid: 45, boost: 90}}\ncheck_interval: 60\nmax_boosts_per_day: 3\nauto_boost_duration: 15\n",
            MINIMAL
        )))
        .unwrap();

        assert_eq!(config.speeds.mid, 45);
        assert_eq!(config.check_interval, 60);
        assert_eq!(config.max_boosts_per_day, 3);
        assert_eq!(config.auto_boost_duration, 15);
    }

    #[test]
    fn test_missing_required_entity() {
        let err = SmartVentConfig::from_yaml(yaml("fan_entity: fan.bathroom\n")).unwrap_err();
        assert!(matches!(err, ConfigError::Section { .. }));
    }

    #[test]
    fn test_malformed_entity_id() {
        let err = SmartVentConfig::from_yaml(yaml(&MINIMAL.replace("fan.bathroom", "Bathroom Fan")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Section { .. }));
    }

    #[test]
    fn test_range_errors_name_the_key() {
        let cases = [
            ("speeds: {low: 30, mid: 152, boost: 100}", "speeds.mid"),
            ("check_interval: 0", "check_interval"),
            ("check_interval: 3601", "check_interval"),
            ("max_boosts_per_day: 0", "max_boosts_per_day"),
            ("max_boosts_per_day: 101", "max_boosts_per_day"),
            ("auto_boost_duration: 0", "auto_boost_duration"),
        ];

        for (extra, expected_key) in cases {
            let err = SmartVentConfig::from_yaml(yaml(&format!("{}{}\n", MINIMAL, extra)))
                .unwrap_err();
            match err {
                ConfigError::InvalidValue { key, .. } => assert_eq!(key, expected_key, "{}", extra),
                other => panic!("unexpected error for {}: {}", extra, other),
            }
        }
    }

    #[test]
    fn test_speed_above_u8_is_rejected() {
        let err = SmartVentConfig::from_yaml(yaml(&format!(
            "{}speeds: {{low: 30, mid: 52, boost: 300}}\n",
            MINIMAL
        )))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Section { .. }));
    }

    #[test]
    fn test_range_edges_accepted() {
        let config = SmartVentConfig::from_yaml(yaml(&format!(
            "{}speeds: {{low: 0, mid: 0, boost: 100}}\ncheck_interval: 3600\nmax_boosts_per_day: 100\n",
            MINIMAL
        )))
        .unwrap();
        assert_eq!(config.speeds.low, 0);
        assert_eq!(config.check_interval, 3600);
    }

    #[test]
    fn test_watched_entities() {
        let config = SmartVentConfig::from_yaml(yaml(MINIMAL)).unwrap();
        let watched: Vec<String> = config
            .watched_entities()
            .iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(
            watched,
            vec![
                "binary_sensor.switch_0",
                "binary_sensor.switch_1",
                "sensor.bath_humidity"
            ]
        );
    }
}
