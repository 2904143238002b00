//! Test host for controller scenarios
//!
//! Stands in for the home automation host: a table of entity states the
//! controller reads, and a service caller that records every command and
//! can be told to fail.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use sv_config::SmartVentConfig;
use sv_controller::{ManualClock, VentController};
use sv_core::{Context, EntityId, ServiceCaller, ServiceError, State, StateReader};

pub const FAN: &str = "fan.bathroom_vent";
pub const HUMIDITY: &str = "sensor.bathroom_humidity";
pub const INPUT_0: &str = "input_boolean.vent_input_0";
pub const INPUT_1: &str = "input_boolean.vent_input_1";

/// A command the controller sent
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub domain: String,
    pub service: String,
    pub data: Value,
}

impl RecordedCall {
    /// The speed carried by the command, whichever protocol it used
    pub fn speed(&self) -> Option<u64> {
        self.data
            .get("percentage")
            .or_else(|| self.data.get("brightness_pct"))
            .and_then(Value::as_u64)
    }
}

#[derive(Default)]
pub struct TestHost {
    states: Mutex<HashMap<String, State>>,
    calls: Mutex<Vec<RecordedCall>>,
    fail_calls: AtomicBool,
}

impl TestHost {
    pub fn set_state(&self, entity_id: &str, value: &str) {
        let id: EntityId = entity_id.parse().unwrap();
        self.states.lock().unwrap().insert(
            entity_id.to_string(),
            State::new(id, value, HashMap::new(), Context::new()),
        );
    }

    pub fn remove_state(&self, entity_id: &str) {
        self.states.lock().unwrap().remove(entity_id);
    }

    /// Set both switch inputs at once
    pub fn set_switch(&self, input_0: &str, input_1: &str) {
        self.set_state(INPUT_0, input_0);
        self.set_state(INPUT_1, input_1);
    }

    pub fn set_humidity(&self, value: &str) {
        self.set_state(HUMIDITY, value);
    }

    pub fn fail_calls(&self, fail: bool) {
        self.fail_calls.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn speeds(&self) -> Vec<u64> {
        self.calls().iter().filter_map(RecordedCall::speed).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl StateReader for TestHost {
    fn state(&self, entity_id: &EntityId) -> Option<State> {
        self.states
            .lock()
            .unwrap()
            .get(&entity_id.to_string())
            .cloned()
    }
}

#[async_trait]
impl ServiceCaller for TestHost {
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        service_data: Value,
        _context: Context,
    ) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(RecordedCall {
            domain: domain.to_string(),
            service: service.to_string(),
            data: service_data,
        });
        if self.fail_calls.load(Ordering::SeqCst) {
            return Err(ServiceError::CallFailed("device did not respond".into()));
        }
        Ok(())
    }
}

pub fn config() -> SmartVentConfig {
    SmartVentConfig::new(
        FAN.parse().unwrap(),
        HUMIDITY.parse().unwrap(),
        INPUT_0.parse().unwrap(),
        INPUT_1.parse().unwrap(),
    )
}

pub struct Harness {
    pub controller: VentController,
    pub host: Arc<TestHost>,
    pub clock: Arc<ManualClock>,
}

/// A controller with speeds 30/52/100, quota 5 and 10 minute boosts
///
/// The fan is available, the switch reads off/off and humidity is 50.
/// The clock starts at 2024-06-01 08:00 UTC.
pub fn harness() -> Harness {
    harness_with(config())
}

pub fn harness_with(config: SmartVentConfig) -> Harness {
    let host = Arc::new(TestHost::default());
    host.set_state(config.fan_entity.to_string().as_str(), "on");
    host.set_switch("off", "off");
    host.set_humidity("50");

    let clock = Arc::new(ManualClock::at(
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
    ));
    let controller = VentController::new(config, host.clone(), host.clone(), clock.clone());

    Harness {
        controller,
        host,
        clock,
    }
}
