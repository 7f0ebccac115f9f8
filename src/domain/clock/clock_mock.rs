use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, RwLock};

use crate::domain::clock::clock::{SharedClock, SystemClock};

/// Settable clock for tests and reproducible exports. Clones share the same time.
#[derive(Debug, Clone)]
pub struct MockClock {
    pub time: Arc<RwLock<DateTime<Utc>>>,
}

impl MockClock {
    pub fn new(time: DateTime<Utc>) -> MockClock {
        MockClock { time: Arc::new(RwLock::new(time)) }
    }

    /// Clock fixed at the given unix timestamp (seconds). Falls back to the epoch for out of range values.
    pub fn at_unix(seconds: i64) -> MockClock {
        let time = Utc.timestamp_opt(seconds, 0).single().unwrap_or_default();
        MockClock::new(time)
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.time.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = time;
    }

    pub fn advance_minutes(&self, minutes: i64) {
        let mut guard = self.time.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += Duration::minutes(minutes);
    }

    pub fn shared(&self) -> SharedClock {
        SharedClock::new(self.clone())
    }
}

impl SystemClock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clock_is_shared_between_clones() {
        let clock = MockClock::at_unix(1_709_301_600);
        let shared = clock.shared();

        assert_eq!(shared.timestamp(), "2024-03-01T14:00:00Z");

        clock.advance_minutes(90);
        assert_eq!(shared.timestamp(), "2024-03-01T15:30:00Z");
    }
}
