//! Source of "now" for timestamping and expiry checks.

use chrono::{DateTime, SubsecRound, Utc};

/// Supplies the current UTC instant.
///
/// Instants are whole seconds so that a timestamp written into a tag parses
/// back to exactly the same value.
pub trait Clock {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time from the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn system_clock_drops_subseconds() {
        assert_eq!(SystemClock.now().nanosecond(), 0);
    }
}
