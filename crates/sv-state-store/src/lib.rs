//! Entity state storage
//!
//! The StateStore holds the latest state of every entity the controller
//! reads (switch inputs, humidity sensor, fan) and the entities it
//! publishes. Every write fires STATE_CHANGED on the event bus.
//!
//! Entities are never removed: a device that goes away reports
//! `unavailable` instead.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use sv_core::events::StateChangedData;
use sv_core::{Context, EntityId, State, StateReader};
use sv_event_bus::EventBus;
use tracing::{debug, instrument};

/// Latest state per entity, safe to share between tasks
pub struct StateStore {
    /// Entity states keyed by entity_id string
    states: DashMap<String, State>,
    /// Event bus for firing state change events
    event_bus: Arc<EventBus>,
}

impl StateStore {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            states: DashMap::new(),
            event_bus,
        }
    }

    /// Write the state of an entity and fire STATE_CHANGED
    ///
    /// `last_changed` is carried over from the previous state when the
    /// value itself is unchanged.
    #[instrument(skip(self, state, attributes, context), fields(entity_id = %entity_id))]
    pub fn set(
        &self,
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> State {
        let key = entity_id.to_string();
        let old_state = self.states.get(&key).map(|s| s.clone());

        let new_state = match &old_state {
            Some(existing) => existing.with_update(state, attributes, context.clone()),
            None => State::new(entity_id.clone(), state, attributes, context.clone()),
        };

        debug!(
            state = %new_state.state,
            changed = old_state.as_ref().map_or(true, |s| s.state != new_state.state),
            "Setting entity state"
        );

        self.states.insert(key, new_state.clone());

        self.event_bus.fire(
            StateChangedData {
                entity_id,
                old_state,
                new_state: new_state.clone(),
            },
            context,
        );

        new_state
    }

    /// Get the current state of an entity
    pub fn get(&self, entity_id: &str) -> Option<State> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    /// Check if an entity is in a specific state
    pub fn is_state(&self, entity_id: &str, state: &str) -> bool {
        self.states
            .get(entity_id)
            .map_or(false, |current| current.state == state)
    }

    pub fn entity_count(&self) -> usize {
        self.states.len()
    }
}

impl StateReader for StateStore {
    fn state(&self, entity_id: &EntityId) -> Option<State> {
        self.get(&entity_id.to_string())
    }
}
