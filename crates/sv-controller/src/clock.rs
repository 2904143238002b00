//! Time source used for boost timers and the daily quota

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use std::sync::{PoisonError, RwLock};

/// Where the controller gets the current time from
pub trait Clock: Send + Sync {
    /// Current instant, used for boost end times
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date, used for the daily boost quota
    fn today(&self) -> NaiveDate;
}

/// Wall clock; the quota day follows the process' local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock that only moves when told to
///
/// Calendar dates are taken in UTC so day rollovers happen at the same
/// instant on every machine.
#[derive(Debug)]
pub struct ManualClock {
    current: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            current: RwLock::new(time),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = time;
    }

    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current += duration;
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.advance(Duration::minutes(minutes));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
