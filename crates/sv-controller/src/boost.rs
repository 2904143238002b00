//! Timed boost overrides

use chrono::{DateTime, Utc};
use std::fmt;

use crate::VentMode;

/// What started the current boost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostKind {
    /// Started by high humidity, counts against the daily quota
    Auto,
    /// Started by an explicit force request, exempt from the quota
    Manual,
}

impl fmt::Display for BoostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoostKind::Auto => f.write_str("auto"),
            BoostKind::Manual => f.write_str("manual"),
        }
    }
}

/// The boost override layered on top of the switch mode
///
/// A boost always has an end time; a manual boost also remembers the mode
/// to go back to when it expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoostState {
    #[default]
    Idle,
    Auto {
        ends_at: DateTime<Utc>,
    },
    Manual {
        ends_at: DateTime<Utc>,
        /// None when the manual boost replaced another boost
        restore_mode: Option<VentMode>,
    },
}

impl BoostState {
    pub fn is_active(&self) -> bool {
        !matches!(self, BoostState::Idle)
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, BoostState::Auto { .. })
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, BoostState::Manual { .. })
    }

    pub fn kind(&self) -> Option<BoostKind> {
        match self {
            BoostState::Idle => None,
            BoostState::Auto { .. } => Some(BoostKind::Auto),
            BoostState::Manual { .. } => Some(BoostKind::Manual),
        }
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        match self {
            BoostState::Idle => None,
            BoostState::Auto { ends_at } | BoostState::Manual { ends_at, .. } => Some(*ends_at),
        }
    }

    /// The mode to return to once this boost runs out
    pub fn restore_mode(&self) -> Option<VentMode> {
        match self {
            BoostState::Idle => None,
            BoostState::Auto { .. } => Some(VentMode::Mid),
            BoostState::Manual { restore_mode, .. } => Some(restore_mode.unwrap_or(VentMode::Mid)),
        }
    }

    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        self.ends_at().is_some_and(|ends_at| now >= ends_at)
    }
}
