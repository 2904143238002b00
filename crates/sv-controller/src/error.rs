//! Errors surfaced by the controller

use thiserror::Error;

/// Failures the controller reports to its caller
///
/// Unavailable inputs, invalid switch combinations and device failures are
/// not errors: they are handled inside the tick with a safe fallback.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VentError {
    /// An explicit mode request named something other than low, mid or boost
    #[error("invalid mode '{0}', must be one of: low, mid, boost")]
    InvalidMode(String),

    /// Something unanticipated went wrong while processing a tick or command
    #[error("error updating smart vent: {0}")]
    UpdateFailed(String),
}
