//! OTE Intraday Backend Library
//!
//! Resolves the current 15-minute trading interval from the OTE intraday
//! market report and serves the latest snapshot over HTTP.
//! Exposes core modules for use by binaries and tests.

pub mod api;
pub mod clock;
pub mod completeness;
pub mod config;
pub mod interval;
pub mod middleware;
pub mod models;
pub mod poller;
pub mod resolver;
pub mod scheduler;
pub mod scrapers;
pub mod snapshot;

pub use models::{Metric, MetricFields, Row, RowTable};
pub use resolver::{resolve, resolve_at, NoData, Resolution, ResolutionKind};
pub use snapshot::{Snapshot, SnapshotStore};
