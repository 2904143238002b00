//! Ventilation controller
//!
//! Derives a fan speed from a three-position switch and a humidity reading.
//! On top of the switch-selected mode sit two timed overrides: an automatic
//! boost when humidity climbs above the threshold (limited to a number of
//! activations per calendar day) and a forced boost requested explicitly.
//!
//! The controller is passive. The host calls [`VentController::tick`]
//! periodically and whenever an input changes, and calls
//! [`VentController::set_mode`] / [`VentController::force_boost`] for
//! explicit commands. Everything the controller needs from the host goes
//! through [`sv_core::StateReader`] and [`sv_core::ServiceCaller`].

mod actuator;
mod boost;
mod clock;
mod controller;
mod error;
mod humidity;
mod mode;
mod quota;
mod snapshot;
mod switch;

pub use actuator::{SpeedActuator, SpeedOutcome, SpeedProtocol};
pub use boost::{BoostKind, BoostState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::VentController;
pub use error::VentError;
pub use humidity::{read_humidity, HumidityReading, HUMIDITY_THRESHOLD};
pub use mode::VentMode;
pub use quota::DailyQuota;
pub use snapshot::{StatusSnapshot, TickResult};
pub use switch::{decode_switch, SwitchDecode, SwitchFault, SwitchInput};

/// Configuration consumed by the controller
pub use sv_config::{SmartVentConfig, SpeedsConfig};
