//! Quarter-hour refresh loop
//!
//! Each cycle fetches a fresh table, resolves the current interval and
//! publishes the snapshot. Failed attempts are retried after a fixed delay up
//! to a hard cap; when the cap is hit the previous snapshot stays in place and
//! the loop waits for the next quarter hour like any other cycle.
//!
//! ```text
//! Idle ──▶ Fetching{1..=max_attempts} ──▶ Published ──(next :00/:15/:30/:45)──▶ Idle
//!                      │
//!                      └── exhausted ───────────────(next quarter hour)──────▶ Idle
//! ```

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::clock::{until_next_quarter_hour, Clock};
use crate::completeness::missing_metrics;
use crate::models::Metric;
use crate::resolver::resolve_at;
use crate::scrapers::{RowSource, SourceError};
use crate::snapshot::{Snapshot, SnapshotStore};

/// Fixed-delay, bounded retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(60))
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub retry: RetryPolicy,
    /// Upper bound on a single fetch of the source table.
    pub fetch_timeout: Duration,
    /// Civil timezone the trading intervals are published in.
    pub timezone: Tz,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            fetch_timeout: Duration::from_secs(30),
            timezone: chrono_tz::Europe::Prague,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    #[default]
    Idle,
    Fetching {
        attempt: u32,
    },
    Published,
}

/// Why a refresh attempt did not produce a snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshError {
    Fetch(String),
    Parse(String),
    Timeout(Duration),
    /// Source returned an empty or unusable table.
    NoData,
    /// Resolution ended on a row that is still incomplete.
    NoCompleteData {
        interval: String,
        missing: Vec<Metric>,
    },
}

impl std::fmt::Display for RefreshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(msg) => write!(f, "fetch failed: {}", msg),
            Self::Parse(msg) => write!(f, "parse failed: {}", msg),
            Self::Timeout(d) => write!(f, "fetch timed out after {}s", d.as_secs()),
            Self::NoData => write!(f, "no data in fetched table"),
            Self::NoCompleteData { interval, missing } => {
                let names: Vec<&str> = missing.iter().map(|m| m.as_str()).collect();
                write!(
                    f,
                    "no complete row (interval {:?} missing {})",
                    interval,
                    names.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for RefreshError {}

impl From<SourceError> for RefreshError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Fetch(msg) => RefreshError::Fetch(msg),
            SourceError::Parse(msg) => RefreshError::Parse(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Published { interval: String, attempts: u32 },
    Exhausted { attempts: u32, last_error: RefreshError },
}

/// Scheduler bookkeeping exposed read-only to the API.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub cycles: u64,
    pub exhausted_cycles: u64,
    pub last_published_interval: Option<String>,
    pub last_published_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub next_run_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct StatusHandle(Arc<RwLock<SchedulerStatus>>);

impl StatusHandle {
    pub fn snapshot(&self) -> SchedulerStatus {
        self.0.read().clone()
    }

    fn update(&self, f: impl FnOnce(&mut SchedulerStatus)) {
        f(&mut self.0.write());
    }
}

pub struct RefreshScheduler {
    source: Arc<dyn RowSource>,
    store: SnapshotStore,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    status: StatusHandle,
}

impl RefreshScheduler {
    pub fn new(
        source: Arc<dyn RowSource>,
        store: SnapshotStore,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            source,
            store,
            clock,
            config,
            status: StatusHandle::default(),
        }
    }

    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// One fetch + resolve. Never publishes.
    async fn attempt(&self) -> Result<Snapshot, RefreshError> {
        let timeout = self.config.fetch_timeout;
        let table = tokio::time::timeout(timeout, self.source.fetch_table())
            .await
            .map_err(|_| RefreshError::Timeout(timeout))??;

        if table.is_empty() {
            return Err(RefreshError::NoData);
        }

        let now = self.clock.now();
        let resolution =
            resolve_at(&table, now, self.config.timezone).map_err(|_| RefreshError::NoData)?;

        debug!(
            rows = table.len(),
            position = resolution.position,
            interval = %resolution.interval(),
            kind = ?resolution.kind,
            "Resolved current interval"
        );

        if !resolution.is_complete() {
            return Err(RefreshError::NoCompleteData {
                interval: resolution.interval().to_string(),
                missing: missing_metrics(&resolution.row),
            });
        }

        Ok(Snapshot::from_resolution(
            &resolution,
            now,
            self.config.timezone,
        ))
    }

    /// Runs attempts until one publishes or the retry cap is reached.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let retry = self.config.retry;
        let mut last_error = RefreshError::NoData;

        for attempt in 1..=retry.max_attempts {
            self.status.update(|s| s.state = SchedulerState::Fetching { attempt });

            match self.attempt().await {
                Ok(snapshot) => {
                    let interval = snapshot.interval.clone();
                    let fallback = !snapshot.fallback_message.is_empty();
                    self.store.publish(snapshot);

                    let published_at = self.clock.now();
                    self.status.update(|s| {
                        s.state = SchedulerState::Published;
                        s.cycles += 1;
                        s.last_published_interval = Some(interval.clone());
                        s.last_published_at = Some(published_at);
                        s.last_error = None;
                    });
                    info!(
                        interval = %interval,
                        attempt,
                        fallback,
                        "✅ Snapshot published"
                    );
                    return CycleOutcome::Published {
                        interval,
                        attempts: attempt,
                    };
                }
                Err(err) => {
                    warn!(
                        attempt,
                        max_attempts = retry.max_attempts,
                        error = %err,
                        "⚠️ Refresh attempt failed"
                    );
                    self.status.update(|s| s.last_error = Some(err.to_string()));
                    last_error = err;
                    if attempt < retry.max_attempts {
                        tokio::time::sleep(retry.delay).await;
                    }
                }
            }
        }

        error!(
            attempts = retry.max_attempts,
            error = %last_error,
            "🛑 Refresh retries exhausted, keeping previous snapshot"
        );
        self.status.update(|s| {
            s.state = SchedulerState::Idle;
            s.cycles += 1;
            s.exhausted_cycles += 1;
        });
        CycleOutcome::Exhausted {
            attempts: retry.max_attempts,
            last_error,
        }
    }

    /// Refreshes immediately, then on every quarter-hour boundary. Never returns.
    pub async fn run(self) {
        info!(
            max_attempts = self.config.retry.max_attempts,
            retry_delay_secs = self.config.retry.delay.as_secs(),
            timezone = %self.config.timezone,
            "🔄 Refresh scheduler started"
        );

        loop {
            self.run_cycle().await;

            let now = self.clock.now();
            let wait = until_next_quarter_hour(now);
            let next_run = now
                + chrono::Duration::from_std(wait).unwrap_or_else(|_| chrono::Duration::zero());
            self.status.update(|s| s.next_run_at = Some(next_run));
            info!(
                next_run = %next_run.with_timezone(&self.config.timezone).format("%H:%M:%S"),
                "Waiting for next quarter hour"
            );

            tokio::time::sleep(wait).await;
            self.status.update(|s| s.state = SchedulerState::Idle);
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
