//! The host the controller runs in

use std::sync::Arc;
use sv_event_bus::EventBus;
use sv_service_registry::ServiceRegistry;
use sv_state_store::StateStore;

/// Event bus, entity states and services shared by every component
pub struct HomeAssistant {
    /// Event bus for pub/sub communication
    pub bus: Arc<EventBus>,
    /// Current entity states
    pub states: Arc<StateStore>,
    /// Service registry for service calls
    pub services: Arc<ServiceRegistry>,
}

impl HomeAssistant {
    pub fn new() -> Self {
        let bus = Arc::new(EventBus::new());
        let states = Arc::new(StateStore::new(bus.clone()));
        let services = Arc::new(ServiceRegistry::new());

        Self {
            bus,
            states,
            services,
        }
    }
}

impl Default for HomeAssistant {
    fn default() -> Self {
        Self::new()
    }
}
