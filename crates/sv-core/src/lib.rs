//! Core types for Smart Vent
//!
//! This crate provides the fundamental types shared by the controller and
//! the host it runs in: EntityId, State, Event, Context, ServiceCall and the
//! two narrow ports the controller needs from its host (`StateReader` and
//! `ServiceCaller`).

mod context;
mod entity_id;
mod event;
mod ports;
mod service_call;
mod state;

pub use context::Context;
pub use entity_id::{EntityId, EntityIdError};
pub use event::{Event, EventData};
pub use ports::{ServiceCaller, StateReader};
pub use service_call::{ServiceCall, ServiceError, SupportsResponse};
pub use state::State;

/// State value reported by an entity the host cannot reach
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// State value reported by an entity that has not produced a reading yet
pub const STATE_UNKNOWN: &str = "unknown";

/// State value of a switched-on entity
pub const STATE_ON: &str = "on";

/// State value of a switched-off entity
pub const STATE_OFF: &str = "off";

/// Standard event types
pub mod events {
    use super::*;

    /// Event type for state changes
    pub const STATE_CHANGED: &str = "state_changed";

    /// Data for STATE_CHANGED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct StateChangedData {
        pub entity_id: EntityId,
        pub old_state: Option<State>,
        pub new_state: State,
    }

    impl EventData for StateChangedData {
        fn event_type() -> &'static str {
            STATE_CHANGED
        }
    }
}
