//! Source of the batch time

use chrono::{NaiveDateTime, SubsecRound, Utc};

/// Provides the batch time embedded in audit and validity values
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Current UTC time, truncated to whole seconds
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc().trunc_subsecs(0)
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_system_clock_has_no_fraction() {
        assert_eq!(SystemClock.now().nanosecond(), 0);
    }
}
