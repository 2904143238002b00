//! Decoding the two-input mode switch
//!
//! | input_0 | input_1 | mode  |
//! |---------|---------|-------|
//! | off     | off     | low   |
//! | on      | off     | mid   |
//! | off     | on      | boost |
//! | on      | on      | low (invalid wiring) |
//!
//! Anything else falls back to low.

use sv_core::{State, STATE_OFF, STATE_ON, STATE_UNAVAILABLE};

use crate::VentMode;

/// The reading of a single switch input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchInput {
    On,
    Off,
    /// The entity is missing or reports "unavailable"
    Unavailable,
    /// Any other state value, e.g. "unknown" during startup
    Unexpected(String),
}

impl SwitchInput {
    pub fn from_state(state: Option<&State>) -> Self {
        match state.map(|s| s.state.as_str()) {
            None | Some(STATE_UNAVAILABLE) => SwitchInput::Unavailable,
            Some(STATE_ON) => SwitchInput::On,
            Some(STATE_OFF) => SwitchInput::Off,
            Some(other) => SwitchInput::Unexpected(other.to_string()),
        }
    }
}

/// Why the decoded mode is a fallback rather than a real selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchFault {
    /// At least one input is missing or unavailable
    Unavailable,
    /// At least one input has a value other than on/off
    Unexpected,
    /// Both inputs are on, which the physical switch cannot produce
    InvalidCombination,
}

/// Result of decoding the two inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchDecode {
    pub mode: VentMode,
    pub fault: Option<SwitchFault>,
}

impl SwitchDecode {
    fn ok(mode: VentMode) -> Self {
        Self { mode, fault: None }
    }

    fn fallback(fault: SwitchFault) -> Self {
        Self {
            mode: VentMode::Low,
            fault: Some(fault),
        }
    }
}

/// Map the two switch inputs to a mode
pub fn decode_switch(input_0: &SwitchInput, input_1: &SwitchInput) -> SwitchDecode {
    use SwitchInput::*;

    match (input_0, input_1) {
        (Unavailable, _) | (_, Unavailable) => SwitchDecode::fallback(SwitchFault::Unavailable),
        (Off, Off) => SwitchDecode::ok(VentMode::Low),
        (On, Off) => SwitchDecode::ok(VentMode::Mid),
        (Off, On) => SwitchDecode::ok(VentMode::Boost),
        (On, On) => SwitchDecode::fallback(SwitchFault::InvalidCombination),
        _ => SwitchDecode::fallback(SwitchFault::Unexpected),
    }
}
