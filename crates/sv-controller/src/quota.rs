//! Daily limit on automatic boosts

use chrono::NaiveDate;

/// Counts automatic boosts per calendar day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyQuota {
    max: u32,
    used: u32,
    last_reset: Option<NaiveDate>,
}

impl DailyQuota {
    pub fn new(max: u32) -> Self {
        Self {
            max,
            used: 0,
            last_reset: None,
        }
    }

    /// Zero the counter if `today` differs from the last reset date
    ///
    /// Returns true when a reset happened. The first call always resets.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.last_reset == Some(today) {
            return false;
        }
        self.used = 0;
        self.last_reset = Some(today);
        true
    }

    pub fn has_remaining(&self) -> bool {
        self.used < self.max
    }

    pub fn record(&mut self) {
        self.used = self.used.saturating_add(1);
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn last_reset(&self) -> Option<NaiveDate> {
        self.last_reset
    }
}
