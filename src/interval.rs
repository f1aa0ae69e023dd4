//! Trading interval labels
//!
//! Turns "HH:MM-HH:MM" labels into half-open time-of-day ranges.
//! Ranges whose end is earlier than their start cross midnight.

use chrono::NaiveTime;

use crate::models::INTERVAL_HEADER;

/// Marker that only appears in repeated table headers.
const PERIOD_MARKER: &str = "Perioda";

/// Half-open `[start, end)` time-of-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// `start > end`, e.g. 23:45-00:00.
    pub wraps: bool,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start,
            end,
            wraps: start > end,
        }
    }

    /// Wrapping ranges match by disjunction rather than on a 48h timeline.
    pub fn contains(&self, now: NaiveTime) -> bool {
        if self.wraps {
            now >= self.start || now < self.end
        } else {
            self.start <= now && now < self.end
        }
    }
}

/// Errors during interval label parsing. Callers drop the row either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalParseError {
    /// Repeated table header, not data.
    HeaderRow,
    Malformed(String),
}

impl IntervalParseError {
    pub fn is_header(&self) -> bool {
        matches!(self, Self::HeaderRow)
    }
}

impl std::fmt::Display for IntervalParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HeaderRow => write!(f, "repeated header row"),
            Self::Malformed(label) => write!(f, "malformed interval label: {:?}", label),
        }
    }
}

impl std::error::Error for IntervalParseError {}

pub fn parse_interval(raw: &str) -> Result<TimeRange, IntervalParseError> {
    let label = raw.trim();

    if label.contains(PERIOD_MARKER) || label.contains(INTERVAL_HEADER) {
        return Err(IntervalParseError::HeaderRow);
    }

    let malformed = || IntervalParseError::Malformed(label.to_string());

    let mut parts = label.split('-');
    let (Some(start), Some(end), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed());
    };

    let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").map_err(|_| malformed())?;
    let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").map_err(|_| malformed())?;

    Ok(TimeRange::new(start, end))
}
