//! Smart Vent Server
//!
//! Main entry point: loads `configuration.yaml`, sets up the helper
//! entities and the smart_vent component, then runs until Ctrl-C.

mod component;
mod entities;
mod hass;
mod helpers;
mod virtual_fan;

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use std::sync::Arc;
use sv_config::load_configuration;
use sv_controller::SystemClock;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::component::SmartVent;
use crate::hass::HomeAssistant;

/// Environment variable naming the config directory
const CONFIG_DIR_ENV: &str = "SMART_VENT_CONFIG";

const DEFAULT_CONFIG_DIR: &str = "config";

/// Config directory: first CLI argument, then the environment, then ./config
fn config_dir(arg: Option<String>, env: Option<String>) -> PathBuf {
    arg.or(env)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR))
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Smart Vent");

    let config_dir = config_dir(
        std::env::args().nth(1),
        std::env::var(CONFIG_DIR_ENV).ok(),
    );
    let config = load_configuration(&config_dir)
        .with_context(|| format!("loading configuration from {}", config_dir.display()))?;

    let hass = HomeAssistant::new();

    helpers::load_input_booleans(&config.input_boolean, &hass.states);
    helpers::register_input_boolean_services(&hass.services, hass.states.clone());
    helpers::load_input_numbers(&config.input_number, &hass.states);
    helpers::register_input_number_services(&hass.services, hass.states.clone());

    let Some(vent_config) = config.smart_vent else {
        info!("No smart_vent configuration found, nothing to do");
        return Ok(());
    };

    virtual_fan::register_virtual_fan(
        &vent_config.fan_entity,
        hass.states.clone(),
        &hass.services,
    );

    let vent = SmartVent::setup(&hass, vent_config, Arc::new(SystemClock)).await?;
    info!(
        fan = %vent.entities().fan(),
        boost_sensor = %vent.entities().boost_sensor(),
        "Smart Vent is running"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    vent.stop().await;

    Ok(())
}
