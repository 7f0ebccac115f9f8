use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Source of wall clock time for audit records and saved scenario results.
///
/// The scheduling core never reads the system clock directly, so exports stay reproducible
/// under a mock clock.
pub trait SystemClock: std::fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// RFC 3339 timestamp with second precision, e.g. `2024-03-01T14:00:00Z`.
    fn timestamp(&self) -> String {
        self.now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }
}

#[derive(Debug, Clone)]
pub struct SharedClock(pub Arc<dyn SystemClock>);

impl SharedClock {
    pub fn new(clock: impl SystemClock + 'static) -> Self {
        SharedClock(Arc::new(clock))
    }

    pub fn wall() -> Self {
        SharedClock::new(WallClock)
    }
}

impl std::ops::Deref for SharedClock {
    type Target = dyn SystemClock;
    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl SystemClock for WallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
