//! Ventilation modes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use sv_config::SpeedsConfig;

use crate::VentError;

/// One of the three named fan speeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VentMode {
    Low,
    Mid,
    Boost,
}

impl VentMode {
    pub const ALL: [VentMode; 3] = [VentMode::Low, VentMode::Mid, VentMode::Boost];

    pub fn as_str(self) -> &'static str {
        match self {
            VentMode::Low => "low",
            VentMode::Mid => "mid",
            VentMode::Boost => "boost",
        }
    }

    /// The configured speed percentage for this mode
    pub fn speed(self, speeds: &SpeedsConfig) -> u8 {
        match self {
            VentMode::Low => speeds.low,
            VentMode::Mid => speeds.mid,
            VentMode::Boost => speeds.boost,
        }
    }
}

impl FromStr for VentMode {
    type Err = VentError;

    /// Mode names are matched exactly, as sent by service calls
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| VentError::InvalidMode(s.to_string()))
    }
}

impl fmt::Display for VentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
