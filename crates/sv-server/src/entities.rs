//! Entities that show the controller's state

use serde_json::{json, Value};
use std::collections::HashMap;
use sv_controller::StatusSnapshot;
use sv_core::{Context, EntityId, EntityIdError, STATE_OFF, STATE_ON};
use sv_state_store::StateStore;

/// The fan the controller presents itself as
pub const FAN_OBJECT_ID: &str = "smart_ventilation";

/// The binary sensor showing whether a boost is running
pub const BOOST_SENSOR_OBJECT_ID: &str = "smart_vent_auto_boost";

/// Publishes controller status as entity states
#[derive(Debug, Clone)]
pub struct StatusEntities {
    fan: EntityId,
    boost_sensor: EntityId,
}

impl StatusEntities {
    pub fn new() -> Result<Self, EntityIdError> {
        Ok(Self {
            fan: EntityId::new("fan", FAN_OBJECT_ID)?,
            boost_sensor: EntityId::new("binary_sensor", BOOST_SENSOR_OBJECT_ID)?,
        })
    }

    pub fn fan(&self) -> &EntityId {
        &self.fan
    }

    pub fn boost_sensor(&self) -> &EntityId {
        &self.boost_sensor
    }

    /// Write both entities from a status snapshot
    pub fn publish(&self, states: &StateStore, status: &StatusSnapshot) {
        // The controller is always running, so the fan is always on
        states.set(
            self.fan.clone(),
            STATE_ON,
            fan_attributes(status),
            Context::new(),
        );

        let boost_state = if status.auto_boost_active {
            STATE_ON
        } else {
            STATE_OFF
        };
        states.set(
            self.boost_sensor.clone(),
            boost_state,
            boost_sensor_attributes(status),
            Context::new(),
        );
    }
}

fn fan_attributes(status: &StatusSnapshot) -> HashMap<String, Value> {
    HashMap::from([
        ("friendly_name".to_string(), json!("Smart Ventilation")),
        ("percentage".to_string(), json!(status.target_speed)),
        ("speed_count".to_string(), json!(100)),
        ("mode".to_string(), json!(status.current_mode)),
        ("humidity".to_string(), json!(status.humidity)),
        (
            "auto_boost_active".to_string(),
            json!(status.auto_boost_active),
        ),
        (
            "auto_boost_count_today".to_string(),
            json!(status.auto_boost_count_today),
        ),
    ])
}

fn boost_sensor_attributes(status: &StatusSnapshot) -> HashMap<String, Value> {
    let icon = if status.auto_boost_active {
        "mdi:fan-plus"
    } else {
        "mdi:fan"
    };

    let mut attributes = HashMap::from([
        ("friendly_name".to_string(), json!("Smart Vent Auto Boost")),
        ("icon".to_string(), json!(icon)),
        (
            "boosts_used_today".to_string(),
            json!(status.auto_boost_count_today),
        ),
        (
            "max_boosts_per_day".to_string(),
            json!(status.max_boosts_per_day),
        ),
    ]);

    if status.auto_boost_active {
        if let (Some(seconds), Some(minutes), Some(ends_at)) = (
            status.time_remaining_seconds(),
            status.time_remaining_minutes(),
            status.boost_ends_at,
        ) {
            attributes.insert("time_remaining_seconds".to_string(), json!(seconds));
            attributes.insert("time_remaining_minutes".to_string(), json!(minutes));
            attributes.insert("boost_end_time".to_string(), json!(ends_at.to_rfc3339()));
        }
    }

    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;
    use sv_controller::VentMode;
    use sv_event_bus::EventBus;

    fn idle() -> StatusSnapshot {
        StatusSnapshot {
            current_mode: VentMode::Mid,
            target_speed: 52,
            auto_boost_active: false,
            manual_boost_active: false,
            auto_boost_count_today: 2,
            max_boosts_per_day: 5,
            humidity: Some(64.5),
            boost_ends_at: None,
            time_remaining: None,
        }
    }

    fn boosting() -> StatusSnapshot {
        StatusSnapshot {
            current_mode: VentMode::Boost,
            target_speed: 100,
            auto_boost_active: true,
            boost_ends_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 8, 10, 0).unwrap()),
            time_remaining: Some(Duration::seconds(450)),
            auto_boost_count_today: 3,
            ..idle()
        }
    }

    fn store() -> StateStore {
        StateStore::new(Arc::new(EventBus::new()))
    }

    #[test]
    fn test_publish_idle() {
        let states = store();
        let entities = StatusEntities::new().unwrap();
        entities.publish(&states, &idle());

        let fan = states.get("fan.smart_ventilation").unwrap();
        assert_eq!(fan.state, "on");
        assert_eq!(fan.attributes["percentage"], json!(52));
        assert_eq!(fan.attributes["mode"], json!("mid"));
        assert_eq!(fan.attributes["humidity"], json!(64.5));
        assert_eq!(fan.attributes["auto_boost_active"], json!(false));
        assert_eq!(fan.attributes["auto_boost_count_today"], json!(2));
        assert_eq!(fan.attributes["friendly_name"], json!("Smart Ventilation"));

        let sensor = states.get("binary_sensor.smart_vent_auto_boost").unwrap();
        assert_eq!(sensor.state, "off");
        assert_eq!(sensor.attributes["icon"], json!("mdi:fan"));
        assert_eq!(sensor.attributes["boosts_used_today"], json!(2));
        assert_eq!(sensor.attributes["max_boosts_per_day"], json!(5));
        assert!(!sensor.attributes.contains_key("time_remaining_seconds"));
        assert!(!sensor.attributes.contains_key("boost_end_time"));
    }

    #[test]
    fn test_publish_boosting() {
        let states = store();
        let entities = StatusEntities::new().unwrap();
        entities.publish(&states, &boosting());

        let fan = states.get(&entities.fan().to_string()).unwrap();
        assert_eq!(fan.attributes["percentage"], json!(100));
        assert_eq!(fan.attributes["mode"], json!("boost"));

        let sensor = states.get(&entities.boost_sensor().to_string()).unwrap();
        assert_eq!(sensor.state, "on");
        assert_eq!(sensor.attributes["icon"], json!("mdi:fan-plus"));
        assert_eq!(sensor.attributes["time_remaining_seconds"], json!(450));
        assert_eq!(sensor.attributes["time_remaining_minutes"], json!(7.5));
        assert_eq!(
            sensor.attributes["boost_end_time"],
            json!("2024-06-01T08:10:00+00:00")
        );
    }

    #[test]
    fn test_expired_boost_has_no_countdown() {
        let states = store();
        let entities = StatusEntities::new().unwrap();
        let status = StatusSnapshot {
            time_remaining: None,
            ..boosting()
        };
        entities.publish(&states, &status);

        let sensor = states.get("binary_sensor.smart_vent_auto_boost").unwrap();
        assert_eq!(sensor.state, "on");
        assert!(!sensor.attributes.contains_key("time_remaining_minutes"));
    }

    #[test]
    fn test_unknown_humidity_is_null() {
        let states = store();
        let entities = StatusEntities::new().unwrap();
        let status = StatusSnapshot {
            humidity: None,
            ..idle()
        };
        entities.publish(&states, &status);

        let fan = states.get("fan.smart_ventilation").unwrap();
        assert_eq!(fan.attributes["humidity"], Value::Null);
    }
}
