//! Reading the humidity sensor

use sv_core::State;

/// Relative humidity (percent) above which an automatic boost starts
pub const HUMIDITY_THRESHOLD: f64 = 80.0;

/// Sensor values that mean "no reading right now"
const NO_READING: [&str; 4] = ["unavailable", "unknown", "none", ""];

/// Outcome of reading the humidity sensor
#[derive(Debug, Clone, PartialEq)]
pub enum HumidityReading {
    Value(f64),
    /// The sensor entity doesn't exist
    Missing,
    /// The sensor reports one of the no-reading values
    NoReading(String),
    /// The sensor reports something that isn't a finite number
    Malformed(String),
}

impl HumidityReading {
    /// The usable reading, if any
    pub fn value(&self) -> Option<f64> {
        match self {
            HumidityReading::Value(v) => Some(*v),
            _ => None,
        }
    }
}

/// Interpret the sensor's raw state
pub fn read_humidity(state: Option<&State>) -> HumidityReading {
    let Some(state) = state else {
        return HumidityReading::Missing;
    };

    let raw = state.state.trim();
    if NO_READING.iter().any(|s| raw.eq_ignore_ascii_case(s)) {
        return HumidityReading::NoReading(state.state.clone());
    }

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => HumidityReading::Value(value),
        _ => HumidityReading::Malformed(state.state.clone()),
    }
}
