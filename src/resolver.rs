//! Current interval resolution
//!
//! Picks the row that represents "now" out of a freshly fetched table:
//!
//! 1. Rows whose label does not parse (repeated headers, junk) are skipped.
//! 2. The first row whose range contains `now` wins.
//! 3. Without a match, the latest row that already started is used, and if
//!    every interval starts after `now`, the earliest one.
//! 4. If the chosen row is still incomplete, walk backward through the table
//!    until a complete row shows up.
//!
//! The table is assumed to be in chronological order already; nothing here
//! sorts it.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;

use tracing::debug;

use crate::completeness::{is_complete, is_empty};
use crate::interval::{parse_interval, IntervalParseError, TimeRange};
use crate::models::{Row, RowTable};

/// How the returned row was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionKind {
    Exact,
    LastBefore,
    /// Every interval starts after `now`.
    EarliestAhead,
    /// The natural candidate was incomplete. `trigger` is its label.
    Fallback { trigger: String },
    /// Backward walk found nothing complete; the first table row is returned.
    NoCompleteRow,
    /// No row had a parseable label; the last table row is returned.
    NoParseableIntervals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Index of `row` in the source table.
    pub position: usize,
    pub row: Row,
    /// Empty for a complete exact match.
    pub fallback_message: String,
    pub kind: ResolutionKind,
}

impl Resolution {
    fn new(position: usize, row: &Row, kind: ResolutionKind, message: String) -> Self {
        Self {
            position,
            row: row.clone(),
            fallback_message: message,
            kind,
        }
    }

    pub fn is_complete(&self) -> bool {
        is_complete(&self.row)
    }

    pub fn interval(&self) -> &str {
        &self.row.raw_interval
    }
}

/// The table had no rows at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoData;

impl std::fmt::Display for NoData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no data in table")
    }
}

impl std::error::Error for NoData {}

struct ValidRow {
    position: usize,
    range: TimeRange,
}

/// Resolves against `instant` converted to civil time in `tz`.
pub fn resolve_at(table: &RowTable, instant: DateTime<Utc>, tz: Tz) -> Result<Resolution, NoData> {
    resolve(table, instant.with_timezone(&tz).time())
}

pub fn resolve(table: &RowTable, now: NaiveTime) -> Result<Resolution, NoData> {
    let valid: Vec<ValidRow> = table
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(position, row)| match parse_interval(&row.raw_interval) {
            Ok(range) => Some(ValidRow { position, range }),
            Err(IntervalParseError::HeaderRow) => None,
            Err(e) => {
                debug!(position, error = %e, "Skipping row with unparseable interval");
                None
            }
        })
        .collect();

    if valid.is_empty() {
        let last = table.len().checked_sub(1).ok_or(NoData)?;
        return Ok(Resolution::new(
            last,
            &table.rows()[last],
            ResolutionKind::NoParseableIntervals,
            "No parseable intervals found; showing last row by default.".to_string(),
        ));
    }

    let mut exact_match: Option<usize> = None;
    let mut last_before: Option<(usize, NaiveTime)> = None;

    for candidate in &valid {
        if candidate.range.contains(now) {
            exact_match = Some(candidate.position);
            break;
        }

        if candidate.range.start <= now {
            match last_before {
                Some((_, start)) if candidate.range.start < start => {}
                _ => last_before = Some((candidate.position, candidate.range.start)),
            }
        }
    }

    if let Some(position) = exact_match {
        let row = &table.rows()[position];
        if is_empty(row) {
            return fallback_from(table, position);
        }
        return Ok(Resolution::new(
            position,
            row,
            ResolutionKind::Exact,
            String::new(),
        ));
    }

    if let Some((position, _)) = last_before {
        let row = &table.rows()[position];
        if is_empty(row) {
            return fallback_from(table, position);
        }
        let message = format!(
            "No exact match for current time. Showing last known data from {}.",
            row.raw_interval
        );
        return Ok(Resolution::new(
            position,
            row,
            ResolutionKind::LastBefore,
            message,
        ));
    }

    let position = valid[0].position;
    let row = &table.rows()[position];
    if is_empty(row) {
        return fallback_from(table, position);
    }
    let message = format!(
        "All intervals start after {}. Showing earliest interval in data: {}.",
        now.format("%H:%M"),
        row.raw_interval
    );
    Ok(Resolution::new(
        position,
        row,
        ResolutionKind::EarliestAhead,
        message,
    ))
}

/// Walks backward from `start` (inclusive) to the nearest complete row.
fn fallback_from(table: &RowTable, start: usize) -> Result<Resolution, NoData> {
    let first = table.first().ok_or(NoData)?;
    let trigger = table
        .get(start)
        .map(|row| row.raw_interval.clone())
        .unwrap_or_default();

    let rows = table.rows();
    let upper = start.min(rows.len() - 1);

    for position in (0..=upper).rev() {
        let row = &rows[position];
        if is_complete(row) {
            let message = format!(
                "No new data available after interval {}. Showing last known data from {}.",
                trigger, row.raw_interval
            );
            return Ok(Resolution::new(
                position,
                row,
                ResolutionKind::Fallback { trigger },
                message,
            ));
        }
    }

    Ok(Resolution::new(
        0,
        first,
        ResolutionKind::NoCompleteRow,
        "No non-empty row found; showing the earliest row.".to_string(),
    ))
}
