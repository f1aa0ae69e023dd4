//! Published snapshot slot
//!
//! The scheduler is the only writer. Readers (the HTTP layer) load the
//! current `Arc<Snapshot>` lock-free; a publish swaps the whole value so a
//! reader never sees a half-written snapshot.

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::resolver::Resolution;

/// Timestamp format used for `last_updated` and the client's `fetch_time`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of one successful resolution cycle, as served to readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub interval: String,
    pub traded_volume: Option<f64>,
    pub purchased_volume: Option<f64>,
    pub sold_volume: Option<f64>,
    pub weighted_average_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub last_price: Option<f64>,
    pub fallback_message: String,
    pub last_updated: String,
}

impl Snapshot {
    pub fn from_resolution(resolution: &Resolution, resolved_at: DateTime<Utc>, tz: Tz) -> Self {
        let fields = &resolution.row.fields;
        Self {
            interval: resolution.row.raw_interval.clone(),
            traded_volume: fields.traded_volume,
            purchased_volume: fields.purchased_volume,
            sold_volume: fields.sold_volume,
            weighted_average_price: fields.weighted_average_price,
            min_price: fields.min_price,
            max_price: fields.max_price,
            last_price: fields.last_price,
            fallback_message: resolution.fallback_message.clone(),
            last_updated: resolved_at
                .with_timezone(&tz)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
        }
    }
}

/// Single-slot holder for the latest snapshot. Clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    slot: Arc<ArcSwapOption<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current snapshot.
    pub fn publish(&self, snapshot: Snapshot) {
        self.slot.store(Some(Arc::new(snapshot)));
    }

    /// `None` until the first successful publish.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.slot.load_full()
    }

    pub fn is_available(&self) -> bool {
        self.slot.load().is_some()
    }
}
