//! Read-only views of the controller

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::VentMode;

/// What a tick decided
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickResult {
    pub current_mode: VentMode,
    pub target_speed: u8,
    pub auto_boost_active: bool,
    pub humidity: Option<f64>,
}

/// Everything a presentation layer needs to show the controller
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub current_mode: VentMode,
    pub target_speed: u8,
    /// True for both automatic and manual boosts
    pub auto_boost_active: bool,
    pub manual_boost_active: bool,
    pub auto_boost_count_today: u32,
    pub max_boosts_per_day: u32,
    pub humidity: Option<f64>,
    pub boost_ends_at: Option<DateTime<Utc>>,
    /// Time left on the boost; None when idle or already past the end time
    pub time_remaining: Option<Duration>,
}

impl StatusSnapshot {
    pub fn time_remaining_seconds(&self) -> Option<i64> {
        self.time_remaining.map(|d| d.num_seconds())
    }

    /// Remaining minutes rounded to one decimal place
    pub fn time_remaining_minutes(&self) -> Option<f64> {
        self.time_remaining
            .map(|d| (d.num_milliseconds() as f64 / 6_000.0).round() / 10.0)
    }
}
