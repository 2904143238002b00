//! Context type for tracking who caused a state write or service call

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Origin marker carried by every event and service call
///
/// A service handler writes states with the context of the call it is
/// serving, so a `state_changed` event can be traced back to the command
/// that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Context {
    /// Unique identifier for this context (ULID)
    pub id: String,
}

impl Context {
    /// Create a new context with a fresh ULID
    pub fn new() -> Self {
        Self {
            id: Ulid::new().to_string(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
