//! Sending speed commands to the fan device

use serde_json::{json, Value};
use std::sync::Arc;
use sv_core::{Context, EntityId, ServiceCaller, StateReader};
use tracing::{debug, error, warn};

/// How a device takes a speed percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedProtocol {
    /// `fan.set_percentage` with `percentage`
    FanPercentage,
    /// `light.turn_on` with `brightness_pct`, for fans wired through a dimmer
    LightBrightness,
}

impl SpeedProtocol {
    /// Pick the protocol from the device's entity domain
    pub fn for_entity(entity_id: &EntityId) -> Self {
        if entity_id.is_in_domain("light") {
            SpeedProtocol::LightBrightness
        } else {
            SpeedProtocol::FanPercentage
        }
    }

    pub fn domain(self) -> &'static str {
        match self {
            SpeedProtocol::FanPercentage => "fan",
            SpeedProtocol::LightBrightness => "light",
        }
    }

    pub fn service(self) -> &'static str {
        match self {
            SpeedProtocol::FanPercentage => "set_percentage",
            SpeedProtocol::LightBrightness => "turn_on",
        }
    }

    pub fn service_data(self, entity_id: &EntityId, percentage: u8) -> Value {
        match self {
            SpeedProtocol::FanPercentage => json!({
                "entity_id": entity_id.to_string(),
                "percentage": percentage,
            }),
            SpeedProtocol::LightBrightness => json!({
                "entity_id": entity_id.to_string(),
                "brightness_pct": percentage,
            }),
        }
    }
}

/// What happened to a speed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeedOutcome {
    /// The device accepted the command
    Sent,
    /// The fan entity doesn't exist, nothing was sent
    DeviceMissing,
    /// The fan reports unavailable/unknown, nothing was sent
    DeviceUnavailable,
    /// The service call failed
    Failed(String),
}

/// Drives the configured fan entity
///
/// Failures are logged and reported through [`SpeedOutcome`]; they never
/// stop the controller.
pub struct SpeedActuator {
    entity_id: EntityId,
    protocol: SpeedProtocol,
    states: Arc<dyn StateReader>,
    services: Arc<dyn ServiceCaller>,
}

impl SpeedActuator {
    pub fn new(
        entity_id: EntityId,
        states: Arc<dyn StateReader>,
        services: Arc<dyn ServiceCaller>,
    ) -> Self {
        let protocol = SpeedProtocol::for_entity(&entity_id);
        Self {
            entity_id,
            protocol,
            states,
            services,
        }
    }

    /// Send a speed percentage to the device
    pub async fn set_speed(&self, percentage: u8) -> SpeedOutcome {
        match self.states.state(&self.entity_id) {
            None => {
                error!(entity_id = %self.entity_id, "Fan entity not found");
                return SpeedOutcome::DeviceMissing;
            }
            Some(state) if !state.is_available() => {
                warn!(
                    entity_id = %self.entity_id,
                    state = %state.state,
                    "Fan is not available, skipping speed change"
                );
                return SpeedOutcome::DeviceUnavailable;
            }
            Some(_) => {}
        }

        let service_data = self.protocol.service_data(&self.entity_id, percentage);
        match self
            .services
            .call_service(
                self.protocol.domain(),
                self.protocol.service(),
                service_data,
                Context::new(),
            )
            .await
        {
            Ok(()) => {
                debug!(entity_id = %self.entity_id, percentage, "Speed command sent");
                SpeedOutcome::Sent
            }
            Err(e) => {
                error!(
                    entity_id = %self.entity_id,
                    percentage,
                    error = %e,
                    "Error setting ventilation speed"
                );
                SpeedOutcome::Failed(e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for SpeedActuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeedActuator")
            .field("entity_id", &self.entity_id)
            .field("protocol", &self.protocol)
            .finish()
    }
}
