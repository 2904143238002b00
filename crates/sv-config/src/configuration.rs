//! Top-level configuration.yaml document

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::loader::load_yaml;
use crate::smart_vent::SmartVentConfig;

/// Main configuration file name inside the config directory
pub const CONFIG_FILE: &str = "configuration.yaml";

/// Configuration for one `input_boolean` helper entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InputBooleanConfig {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Icon (e.g. "mdi:toggle-switch")
    #[serde(default)]
    pub icon: Option<String>,
    /// Initial state, off when unset
    #[serde(default)]
    pub initial: Option<bool>,
}

/// Configuration for one `input_number` helper entity
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InputNumberConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_step")]
    pub step: f64,
    /// Initial value, `min` when unset
    #[serde(default)]
    pub initial: Option<f64>,
    #[serde(default)]
    pub unit_of_measurement: Option<String>,
}

fn default_step() -> f64 {
    1.0
}

/// The sections of configuration.yaml this program understands
///
/// Other top-level sections are ignored so the file can be shared with
/// other tools.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    /// None when the file has no `smart_vent:` section
    pub smart_vent: Option<SmartVentConfig>,
    /// Helper switches keyed by object id
    pub input_boolean: BTreeMap<String, InputBooleanConfig>,
    /// Helper numbers keyed by object id, e.g. a simulated humidity sensor
    pub input_number: BTreeMap<String, InputNumberConfig>,
}

impl Configuration {
    /// Build from an already tag-processed YAML document
    pub fn from_yaml(document: serde_yaml::Value) -> ConfigResult<Self> {
        let mut root = match document {
            serde_yaml::Value::Mapping(map) => map,
            serde_yaml::Value::Null => return Ok(Self::default()),
            _ => {
                return Err(ConfigError::Section {
                    section: "root".to_string(),
                    reason: "must be a mapping".to_string(),
                })
            }
        };

        let smart_vent = root
            .remove("smart_vent")
            .map(SmartVentConfig::from_yaml)
            .transpose()?;

        // `switch_0:` with no body is allowed and means all defaults
        let input_boolean: BTreeMap<String, Option<InputBooleanConfig>> =
            parse_section(&mut root, "input_boolean")?;
        let input_boolean = input_boolean
            .into_iter()
            .map(|(id, config)| (id, config.unwrap_or_default()))
            .collect::<BTreeMap<_, _>>();

        let input_number: BTreeMap<String, InputNumberConfig> =
            parse_section(&mut root, "input_number")?;

        debug!(
            smart_vent = smart_vent.is_some(),
            input_booleans = input_boolean.len(),
            input_numbers = input_number.len(),
            "Parsed configuration"
        );

        Ok(Self {
            smart_vent,
            input_boolean,
            input_number,
        })
    }
}

fn parse_section<T: serde::de::DeserializeOwned + Default>(
    root: &mut serde_yaml::Mapping,
    key: &str,
) -> ConfigResult<T> {
    match root.remove(key) {
        None | Some(serde_yaml::Value::Null) => Ok(T::default()),
        Some(section) => {
            serde_yaml::from_value(section).map_err(|e| ConfigError::Section {
                section: key.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

/// Load and validate `configuration.yaml` from a config directory
pub fn load_configuration(config_dir: impl Into<PathBuf>) -> ConfigResult<Configuration> {
    let config_dir = config_dir.into();
    info!("Loading configuration from {:?}", config_dir);
    let document = load_yaml(config_dir, CONFIG_FILE)?;
    Configuration::from_yaml(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_full_configuration() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(crate::SECRETS_FILE), "vent_fan: light.shelly_dimmer\n").unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
homeassistant:
  name: Home
input_boolean:
  switch_0:
    name: Switch contact 0
    initial: true
  switch_1:
input_number:
  bath_humidity:
    min: 0
    max: 100
    initial: 55
    unit_of_measurement: "%"
smart_vent:
  fan_entity: !secret vent_fan
  humidity_sensor: sensor.bath_humidity
  input_0: input_boolean.switch_0
  input_1: input_boolean.switch_1
  max_boosts_per_day: 3
"#,
        )
        .unwrap();

        let config = load_configuration(dir.path()).unwrap();
        let vent = config.smart_vent.unwrap();
        assert_eq!(vent.fan_entity.to_string(), "light.shelly_dimmer");
        assert_eq!(vent.max_boosts_per_day, 3);

        assert_eq!(config.input_boolean.len(), 2);
        assert_eq!(config.input_boolean["switch_0"].initial, Some(true));
        assert_eq!(config.input_boolean["switch_1"], InputBooleanConfig::default());

        let humidity = &config.input_number["bath_humidity"];
        assert_eq!(humidity.initial, Some(55.0));
        assert_eq!(humidity.step, 1.0);
        assert_eq!(humidity.unit_of_measurement.as_deref(), Some("%"));
    }

    #[test]
    fn test_without_smart_vent_section() {
        let config = Configuration::from_yaml(serde_yaml::from_str("other: 1\n").unwrap()).unwrap();
        assert!(config.smart_vent.is_none());
        assert!(config.input_boolean.is_empty());
        assert!(config.input_number.is_empty());

        let empty = Configuration::from_yaml(serde_yaml::Value::Null).unwrap();
        assert!(empty.smart_vent.is_none());
    }

    #[test]
    fn test_invalid_smart_vent_section_fails_load() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "smart_vent:\n  fan_entity: fan.bathroom\n  humidity_sensor: sensor.h\n  input_0: binary_sensor.a\n  input_1: binary_sensor.b\n  check_interval: 0\n",
        )
        .unwrap();

        let err = load_configuration(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "check_interval"));
    }

    #[test]
    fn test_input_number_requires_bounds() {
        let err = Configuration::from_yaml(
            serde_yaml::from_str("input_number:\n  humidity:\n    min: 0\n").unwrap(),
        )
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::Section { ref section, .. } if section == "input_number")
        );
    }

    #[test]
    fn test_root_must_be_mapping() {
        let err = Configuration::from_yaml(serde_yaml::from_str("- a\n- b\n").unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Section { .. }));
    }
}
