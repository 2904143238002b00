//! YAML configuration for Smart Vent
//!
//! `configuration.yaml` is read with support for a few custom tags:
//!
//! - `!include path` - Include another YAML file
//! - `!secret key` - Substitute from secrets.yaml
//! - `!env_var VAR` - Environment variable substitution
//!
//! The `smart_vent:` section is then checked against the controller's
//! schema (required entity IDs, speed and interval ranges, defaults).
//!
//! # Example
//!
//! ```ignore
//! use sv_config::load_configuration;
//!
//! let config = load_configuration("/config")?;
//! if let Some(vent) = config.smart_vent {
//!     println!("controlling {}", vent.fan_entity);
//! }
//! ```

mod configuration;
mod error;
mod loader;
mod smart_vent;

pub use configuration::{
    load_configuration, Configuration, InputBooleanConfig, InputNumberConfig, CONFIG_FILE,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::{load_yaml, SECRETS_FILE};
pub use smart_vent::{
    SmartVentConfig, SpeedsConfig, DEFAULT_AUTO_BOOST_DURATION, DEFAULT_CHECK_INTERVAL,
    DEFAULT_MAX_BOOSTS_PER_DAY,
};

pub use serde_yaml::Value;
