//! Event bus with typed pub/sub
//!
//! The state store fires `state_changed` here; the server's runner listens
//! for changes on the switch inputs and humidity sensor and turns them into
//! immediate controller refreshes.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use sv_core::{Context, Event, EventData};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Events a subscriber may fall behind by before it starts losing them
const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub keyed by event type
///
/// Every subscriber gets its own copy of each event. A subscriber that
/// falls more than [`CHANNEL_CAPACITY`] events behind loses the oldest ones
/// and is told so via `RecvError::Lagged`.
#[derive(Default)]
pub struct EventBus {
    /// Per event type senders, created on first subscribe
    senders: DashMap<&'static str, broadcast::Sender<Event>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events carrying `T`
    pub fn subscribe<T: EventData + DeserializeOwned>(&self) -> EventReceiver<T> {
        trace!(event_type = T::event_type(), "Subscribing to event type");
        let rx = self
            .senders
            .entry(T::event_type())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();

        EventReceiver {
            rx,
            _data: PhantomData,
        }
    }

    /// Deliver `data` to every subscriber of its type
    ///
    /// Firing with no subscribers is not an error; the event is dropped.
    pub fn fire<T: EventData + Serialize>(&self, data: T, context: Context) {
        let event_type = T::event_type();
        let Some(sender) = self.senders.get(event_type) else {
            trace!(event_type, "No subscribers, dropping event");
            return;
        };

        match Event::new(data, context).encode() {
            Ok(event) => {
                debug!(event_type, "Firing event");
                // A send error only means every receiver has been dropped
                let _ = sender.send(event);
            }
            Err(e) => warn!(event_type, error = %e, "Dropping event that failed to encode"),
        }
    }
}

/// Receives the events of one type
pub struct EventReceiver<T> {
    rx: broadcast::Receiver<Event>,
    _data: PhantomData<T>,
}

impl<T: EventData + DeserializeOwned> EventReceiver<T> {
    /// Wait for the next event, skipping any whose data doesn't decode
    pub async fn recv(&mut self) -> Result<Event<T>, broadcast::error::RecvError> {
        loop {
            if let Some(event) = self.rx.recv().await?.decode() {
                return Ok(event);
            }
        }
    }

    /// Take the next already-queued event without waiting
    pub fn try_recv(&mut self) -> Result<Event<T>, broadcast::error::TryRecvError> {
        loop {
            if let Some(event) = self.rx.try_recv()?.decode() {
                return Ok(event);
            }
        }
    }
}
