//! Events carried by the event bus
//!
//! The bus moves events as JSON so one channel type serves every kind of
//! payload; subscribers decode back into the payload type they asked for.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Context;

/// Payload of one kind of event
pub trait EventData: Clone + Send + Sync + 'static {
    /// Name subscribers use to select this kind of event
    fn event_type() -> &'static str;
}

/// An event fired on the bus
#[derive(Debug, Clone)]
pub struct Event<T = serde_json::Value> {
    pub event_type: &'static str,
    pub data: T,
    pub time_fired: DateTime<Utc>,
    pub context: Context,
}

impl<T: EventData + Serialize> Event<T> {
    /// Stamp `data` with the current time
    pub fn new(data: T, context: Context) -> Self {
        Self {
            event_type: T::event_type(),
            data,
            time_fired: Utc::now(),
            context,
        }
    }

    /// Convert the payload to JSON for the bus
    pub fn encode(self) -> Result<Event, serde_json::Error> {
        Ok(Event {
            event_type: self.event_type,
            data: serde_json::to_value(self.data)?,
            time_fired: self.time_fired,
            context: self.context,
        })
    }
}

impl Event {
    /// Decode the payload, or `None` if it isn't a `T`
    pub fn decode<T: EventData + DeserializeOwned>(self) -> Option<Event<T>> {
        if self.event_type != T::event_type() {
            return None;
        }
        let data = serde_json::from_value(self.data).ok()?;
        Some(Event {
            event_type: self.event_type,
            data,
            time_fired: self.time_fired,
            context: self.context,
        })
    }
}
