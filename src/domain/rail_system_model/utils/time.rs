use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minutes since the start of the service day (00:00). Values past 1440 denote the following day.
pub type Minutes = i64;

pub const MINUTES_PER_HOUR: Minutes = 60;
pub const MINUTES_PER_DAY: Minutes = 24 * MINUTES_PER_HOUR;

/// Half-open time interval `[start, end)` in minutes.
///
/// Intervals are not validated on construction; degenerate intervals are rejected by the
/// constraint validator before they can reach the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: Minutes,
    pub end: Minutes,
}

impl TimeInterval {
    pub fn new(start: Minutes, end: Minutes) -> Self {
        TimeInterval { start, end }
    }

    /// Builds an interval from `HH:MM` wall clock components, e.g. `TimeInterval::hm((14, 0), (16, 30))`.
    pub fn hm(start: (i64, i64), end: (i64, i64)) -> Self {
        TimeInterval { start: start.0 * MINUTES_PER_HOUR + start.1, end: end.0 * MINUTES_PER_HOUR + end.1 }
    }

    pub fn duration(&self) -> Minutes {
        self.end - self.start
    }

    pub fn is_degenerate(&self) -> bool {
        self.start >= self.end
    }

    /// `[a,b)` and `[c,d)` intersect iff `a < d && c < b`.
    pub fn intersects(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Like `intersects`, but both intervals are padded by `buffer` minutes of required separation.
    pub fn intersects_with_buffer(&self, other: &TimeInterval, buffer: Minutes) -> bool {
        self.start < other.end + buffer && other.start < self.end + buffer
    }

    pub fn intersection(&self, other: &TimeInterval) -> Option<TimeInterval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);

        if start < end { Some(TimeInterval { start, end }) } else { None }
    }

    pub fn shifted(&self, minutes: Minutes) -> TimeInterval {
        TimeInterval { start: self.start + minutes, end: self.end + minutes }
    }

    pub fn with_start(&self, start: Minutes) -> TimeInterval {
        TimeInterval { start, end: start + self.duration() }
    }

    pub fn contains(&self, time: Minutes) -> bool {
        self.start <= time && time < self.end
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{})", format_minutes(self.start), format_minutes(self.end))
    }
}

/// Parses a `HH:MM` wall clock time into minutes of the service day. `24:00` is accepted as the day end.
pub fn parse_minutes(value: &str) -> Result<Minutes, chrono::ParseError> {
    let value = value.trim();
    if value == "24:00" {
        return Ok(MINUTES_PER_DAY);
    }

    let time = NaiveTime::parse_from_str(value, "%H:%M")?;
    Ok(time.hour() as Minutes * MINUTES_PER_HOUR + time.minute() as Minutes)
}

/// Formats minutes as `HH:MM`; times past midnight keep counting hours (`25:10`).
pub fn format_minutes(minutes: Minutes) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.abs();
    format!("{}{:02}:{:02}", sign, minutes / MINUTES_PER_HOUR, minutes % MINUTES_PER_HOUR)
}
