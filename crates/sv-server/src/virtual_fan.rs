//! A stand-in for the physical fan
//!
//! The standalone server has no device integrations, so the configured fan
//! entity is backed by a handler that records the commanded speed in the
//! state store. Both speed protocols are served: `fan.set_percentage` and
//! `light.turn_on` for dimmer-driven fans. Only the configured entity is
//! updated, whatever its domain.

use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use sv_controller::SpeedProtocol;
use sv_core::{Context, EntityId, ServiceCall, ServiceError, STATE_OFF, STATE_ON};
use sv_service_registry::{ServiceDescription, ServiceRegistry};
use sv_state_store::StateStore;
use tracing::{debug, info};

/// Create the fan entity if needed and serve its speed service
pub fn register_virtual_fan(
    entity_id: &EntityId,
    states: Arc<StateStore>,
    services: &ServiceRegistry,
) {
    let protocol = SpeedProtocol::for_entity(entity_id);
    let speed_key = match protocol {
        SpeedProtocol::FanPercentage => "percentage",
        SpeedProtocol::LightBrightness => "brightness_pct",
    };

    if states.get(&entity_id.to_string()).is_none() {
        states.set(
            entity_id.clone(),
            STATE_OFF,
            HashMap::from([(speed_key.to_string(), json!(0))]),
            Context::new(),
        );
    }

    if services.has_service(protocol.domain(), protocol.service()) {
        debug!(
            service = %format!("{}.{}", protocol.domain(), protocol.service()),
            "Speed service already provided"
        );
        return;
    }

    let fan = entity_id.clone();
    services.register(
        ServiceDescription::new(protocol.domain(), protocol.service())
            .with_name("Set speed")
            .with_description("Set the speed of a virtual fan")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    speed_key: {"type": "integer", "minimum": 0, "maximum": 100}
                },
                "required": [speed_key]
            })),
        move |call: ServiceCall| {
            let states = states.clone();
            let fan = fan.clone();
            async move {
                let speed: u8 = call.get(speed_key).ok_or_else(|| {
                    ServiceError::InvalidData(format!("{} must be 0-100", speed_key))
                })?;
                let state = if speed > 0 { STATE_ON } else { STATE_OFF };

                for entity_id in call.target_entities() {
                    if entity_id != fan {
                        debug!(entity_id = %entity_id, "Not the virtual fan, ignoring");
                        continue;
                    }
                    let mut attributes = states
                        .get(&entity_id.to_string())
                        .map(|s| s.attributes)
                        .unwrap_or_default();
                    attributes.insert(speed_key.to_string(), json!(speed));
                    states.set(entity_id, state, attributes, call.context.clone());
                }
                Ok(None)
            }
        },
    );

    info!(entity_id = %entity_id, "Virtual fan registered");
}

#[cfg(test)]
mod tests {
    use super::*;
    use sv_event_bus::EventBus;

    fn setup(entity_id: &str) -> (Arc<StateStore>, ServiceRegistry, EntityId) {
        let states = Arc::new(StateStore::new(Arc::new(EventBus::new())));
        let services = ServiceRegistry::new();
        let id: EntityId = entity_id.parse().unwrap();
        register_virtual_fan(&id, states.clone(), &services);
        (states, services, id)
    }

    #[tokio::test]
    async fn test_fan_percentage() {
        let (states, services, _) = setup("fan.bathroom_vent");
        assert!(states.is_state("fan.bathroom_vent", "off"));
        assert!(services.has_service("fan", "set_percentage"));

        let context = Context::new();
        services
            .call(
                "fan",
                "set_percentage",
                json!({"entity_id": "fan.bathroom_vent", "percentage": 52}),
                context.clone(),
                false,
            )
            .await
            .unwrap();

        let fan = states.get("fan.bathroom_vent").unwrap();
        assert_eq!(fan.state, "on");
        assert_eq!(fan.attributes["percentage"], json!(52));
        assert_eq!(fan.context, context);
    }

    #[tokio::test]
    async fn test_light_brightness() {
        let (states, services, _) = setup("light.vent_dimmer");
        assert!(services.has_service("light", "turn_on"));

        services
            .call(
                "light",
                "turn_on",
                json!({"entity_id": "light.vent_dimmer", "brightness_pct": 0}),
                Context::new(),
                false,
            )
            .await
            .unwrap();
        assert!(states.is_state("light.vent_dimmer", "off"));

        let err = services
            .call(
                "light",
                "turn_on",
                json!({"entity_id": "light.vent_dimmer", "brightness_pct": 140}),
                Context::new(),
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_fan_outside_fan_domain() {
        let (states, services, _) = setup("switch.vent");
        assert!(services.has_service("fan", "set_percentage"));

        services
            .call(
                "fan",
                "set_percentage",
                json!({"entity_id": "switch.vent", "percentage": 100}),
                Context::new(),
                false,
            )
            .await
            .unwrap();

        let fan = states.get("switch.vent").unwrap();
        assert_eq!(fan.state, "on");
        assert_eq!(fan.attributes["percentage"], json!(100));
    }

    #[tokio::test]
    async fn test_other_targets_are_ignored() {
        let (states, services, _) = setup("fan.bathroom_vent");

        services
            .call(
                "fan",
                "set_percentage",
                json!({"entity_id": "fan.kitchen", "percentage": 30}),
                Context::new(),
                false,
            )
            .await
            .unwrap();

        assert!(states.get("fan.kitchen").is_none());
        assert!(states.is_state("fan.bathroom_vent", "off"));
    }

    #[test]
    fn test_existing_state_is_kept() {
        let states = Arc::new(StateStore::new(Arc::new(EventBus::new())));
        let id: EntityId = "fan.bathroom_vent".parse().unwrap();
        states.set(id.clone(), "unavailable", HashMap::new(), Context::new());

        register_virtual_fan(&id, states.clone(), &ServiceRegistry::new());
        assert!(states.is_state("fan.bathroom_vent", "unavailable"));
    }
}
