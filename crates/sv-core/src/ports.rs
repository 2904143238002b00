//! The two collaborator interfaces the controller needs from its host
//!
//! The controller never subscribes to anything itself: it reads current
//! states on demand and sends commands. Whatever schedules its ticks is the
//! host's business.

use async_trait::async_trait;

use crate::{Context, EntityId, ServiceError, State};

/// Read access to current entity states
pub trait StateReader: Send + Sync {
    /// Current state of an entity, or None if the host doesn't know it
    fn state(&self, entity_id: &EntityId) -> Option<State>;
}

/// Issues service calls to devices and waits for them to complete
#[async_trait]
pub trait ServiceCaller: Send + Sync {
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        service_data: serde_json::Value,
        context: Context,
    ) -> Result<(), ServiceError>;
}
