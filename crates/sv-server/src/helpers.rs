//! Helper entities for hosts without physical inputs
//!
//! `input_boolean` entities stand in for the two switch contacts and an
//! `input_number` can stand in for the humidity sensor. Both keep their
//! value in the state store, so changing them fires `state_changed` like a
//! real device would.

use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use sv_config::{InputBooleanConfig, InputNumberConfig};
use sv_core::{Context, EntityId, ServiceCall, ServiceError, STATE_OFF, STATE_ON};
use sv_service_registry::{ServiceDescription, ServiceRegistry};
use sv_state_store::StateStore;
use tracing::{debug, info, warn};

const INPUT_BOOLEAN: &str = "input_boolean";
const INPUT_NUMBER: &str = "input_number";

/// Create the configured input_boolean entities
pub fn load_input_booleans(
    config: &BTreeMap<String, InputBooleanConfig>,
    states: &StateStore,
) -> usize {
    let mut count = 0;

    for (id, config) in config {
        let entity_id = match EntityId::new(INPUT_BOOLEAN, id.as_str()) {
            Ok(e) => e,
            Err(e) => {
                warn!("Invalid input_boolean id '{}': {}", id, e);
                continue;
            }
        };

        let state = if config.initial.unwrap_or(false) {
            STATE_ON
        } else {
            STATE_OFF
        };

        let mut attributes = HashMap::new();
        if let Some(name) = &config.name {
            attributes.insert("friendly_name".to_string(), json!(name));
        }
        if let Some(icon) = &config.icon {
            attributes.insert("icon".to_string(), json!(icon));
        }

        states.set(entity_id, state, attributes, Context::new());
        debug!("Loaded input_boolean.{} = {}", id, state);
        count += 1;
    }

    if count > 0 {
        info!("Loaded {} input_boolean entities", count);
    }
    count
}

/// Register input_boolean.turn_on / turn_off / toggle
pub fn register_input_boolean_services(services: &ServiceRegistry, states: Arc<StateStore>) {
    for (service, name) in [
        ("turn_on", "Turn on"),
        ("turn_off", "Turn off"),
        ("toggle", "Toggle"),
    ] {
        let states = states.clone();
        services.register(
            ServiceDescription::new(INPUT_BOOLEAN, service)
                .with_name(name)
                .with_description(format!("{} an input boolean", name)),
            move |call: ServiceCall| {
                let states = states.clone();
                async move {
                    for entity_id in targets(&call, INPUT_BOOLEAN) {
                        let Some(current) = states.get(&entity_id.to_string()) else {
                            continue;
                        };
                        let new_state = match call.service.as_str() {
                            "turn_on" => STATE_ON,
                            "turn_off" => STATE_OFF,
                            _ if current.is_on() => STATE_OFF,
                            _ => STATE_ON,
                        };
                        states.set(
                            entity_id,
                            new_state,
                            current.attributes.clone(),
                            call.context.clone(),
                        );
                    }
                    Ok(None)
                }
            },
        );
    }

    info!("Input boolean services registered");
}

/// Create the configured input_number entities
pub fn load_input_numbers(
    config: &BTreeMap<String, InputNumberConfig>,
    states: &StateStore,
) -> usize {
    let mut count = 0;

    for (id, config) in config {
        let entity_id = match EntityId::new(INPUT_NUMBER, id.as_str()) {
            Ok(e) => e,
            Err(e) => {
                warn!("Invalid input_number id '{}': {}", id, e);
                continue;
            }
        };

        if config.min >= config.max {
            warn!(
                "input_number.{}: min ({}) must be less than max ({})",
                id, config.min, config.max
            );
            continue;
        }

        let value = config
            .initial
            .unwrap_or(config.min)
            .clamp(config.min, config.max);

        let mut attributes = HashMap::new();
        if let Some(name) = &config.name {
            attributes.insert("friendly_name".to_string(), json!(name));
        }
        if let Some(icon) = &config.icon {
            attributes.insert("icon".to_string(), json!(icon));
        }
        if let Some(unit) = &config.unit_of_measurement {
            attributes.insert("unit_of_measurement".to_string(), json!(unit));
        }
        attributes.insert("min".to_string(), json!(config.min));
        attributes.insert("max".to_string(), json!(config.max));
        attributes.insert("step".to_string(), json!(config.step));

        let state = format_number(value);
        debug!("Loaded input_number.{} = {}", id, state);
        states.set(entity_id, state, attributes, Context::new());
        count += 1;
    }

    if count > 0 {
        info!("Loaded {} input_number entities", count);
    }
    count
}

/// Register input_number.set_value / increment / decrement
pub fn register_input_number_services(services: &ServiceRegistry, states: Arc<StateStore>) {
    let states_clone = states.clone();
    services.register(
        ServiceDescription::new(INPUT_NUMBER, "set_value")
            .with_name("Set value")
            .with_description("Set the value of an input number")
            .with_schema(json!({
                "type": "object",
                "properties": {"value": {"type": "number"}},
                "required": ["value"]
            })),
        move |call: ServiceCall| {
            let states = states_clone.clone();
            async move {
                let value: f64 = call
                    .get("value")
                    .ok_or_else(|| ServiceError::InvalidData("value must be a number".into()))?;
                for entity_id in targets(&call, INPUT_NUMBER) {
                    update_number(&states, entity_id, &call.context, |_, _| value);
                }
                Ok(None)
            }
        },
    );

    for (service, name, direction) in [
        ("increment", "Increment", 1.0),
        ("decrement", "Decrement", -1.0),
    ] {
        let states = states.clone();
        services.register(
            ServiceDescription::new(INPUT_NUMBER, service)
                .with_name(name)
                .with_description(format!("{} the value of an input number", name)),
            move |call: ServiceCall| {
                let states = states.clone();
                async move {
                    for entity_id in targets(&call, INPUT_NUMBER) {
                        update_number(&states, entity_id, &call.context, |value, step| {
                            value + direction * step
                        });
                    }
                    Ok(None)
                }
            },
        );
    }

    info!("Input number services registered");
}

/// Apply `f(current, step)` to an input_number, clamped to its bounds
fn update_number(
    states: &StateStore,
    entity_id: EntityId,
    context: &Context,
    f: impl Fn(f64, f64) -> f64,
) {
    let Some(current) = states.get(&entity_id.to_string()) else {
        return;
    };
    let attr = |key: &str, default: f64| {
        current
            .attributes
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    };
    let (min, max, step) = (attr("min", 0.0), attr("max", 100.0), attr("step", 1.0));
    let value: f64 = current.state.parse().unwrap_or(min);

    let new_value = f(value, step).clamp(min, max);
    states.set(
        entity_id,
        format_number(new_value),
        current.attributes.clone(),
        context.clone(),
    );
}

/// Format a number for a state value, without a trailing ".0"
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

fn targets(call: &ServiceCall, domain: &str) -> Vec<EntityId> {
    call.target_entities()
        .into_iter()
        .filter(|e| e.is_in_domain(domain))
        .collect()
}
