//! Polling client
//!
//! Fetches the latest snapshot from the read API on a fixed interval and
//! appends it to a local CSV log. Runs as its own process; the log is its
//! only state.

use anyhow::{Context, Result};
use chrono::Local;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::snapshot::{Snapshot, TIMESTAMP_FORMAT};

/// Column order of the CSV log.
pub const LOG_COLUMNS: [&str; 11] = [
    "interval",
    "traded_volume",
    "purchased_volume",
    "sold_volume",
    "weighted_average_price",
    "min_price",
    "max_price",
    "last_price",
    "fallback_message",
    "last_updated",
    "fetch_time",
];

/// One appended log line: a snapshot plus the client-side fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
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
    pub fetch_time: String,
}

impl LogRecord {
    pub fn new(snapshot: Snapshot, fetch_time: String) -> Self {
        Self {
            interval: snapshot.interval,
            traded_volume: snapshot.traded_volume,
            purchased_volume: snapshot.purchased_volume,
            sold_volume: snapshot.sold_volume,
            weighted_average_price: snapshot.weighted_average_price,
            min_price: snapshot.min_price,
            max_price: snapshot.max_price,
            last_price: snapshot.last_price,
            fallback_message: snapshot.fallback_message,
            last_updated: snapshot.last_updated,
            fetch_time,
        }
    }
}

/// Append-only CSV log. The header goes in once, when the file is new or empty.
#[derive(Debug, Clone)]
pub struct SnapshotLog {
    path: PathBuf,
}

impl SnapshotLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &LogRecord) -> Result<()> {
        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer
            .serialize(record)
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        writer.flush()?;
        Ok(())
    }
}

pub struct PollerClient {
    client: Client,
    api_url: String,
}

impl PollerClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    /// Any non-2xx answer (503 before the first publish included) is an error.
    pub async fn fetch(&self) -> Result<Snapshot> {
        let snapshot = self
            .client
            .get(&self.api_url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.api_url))?
            .error_for_status()?
            .json::<Snapshot>()
            .await
            .context("Invalid snapshot payload")?;
        Ok(snapshot)
    }
}

/// Fetch, append, sleep. Failures are logged and the loop carries on.
pub async fn run_poller(client: PollerClient, log: SnapshotLog, every: Duration) -> Result<()> {
    info!(
        api_url = %client.api_url,
        csv = %log.path().display(),
        every_secs = every.as_secs(),
        "📡 Poller started"
    );

    loop {
        match client.fetch().await {
            Ok(snapshot) => {
                let fetch_time = Local::now().format(TIMESTAMP_FORMAT).to_string();
                let interval = snapshot.interval.clone();
                match log.append(&LogRecord::new(snapshot, fetch_time)) {
                    Ok(()) => info!(interval = %interval, "💾 Snapshot appended"),
                    Err(e) => warn!(error = %format!("{:#}", e), "Failed to append snapshot"),
                }
            }
            Err(e) => warn!(error = %format!("{:#}", e), "Failed to fetch snapshot"),
        }

        tokio::time::sleep(every).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{create_router, AppState};
    use crate::scheduler::StatusHandle;
    use crate::snapshot::SnapshotStore;
    use tokio::net::TcpListener;

    async fn serve(store: SnapshotStore) -> String {
        let app = create_router(AppState {
            store,
            status: StatusHandle::default(),
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api/data", addr)
    }

    fn client(url: &str) -> PollerClient {
        PollerClient::new(url, Duration::from_secs(5)).unwrap()
    }

    fn snapshot(interval: &str, message: &str) -> Snapshot {
        Snapshot {
            interval: interval.to_string(),
            traded_volume: Some(10.5),
            purchased_volume: Some(5.0),
            sold_volume: Some(5.5),
            weighted_average_price: Some(98.1),
            min_price: Some(90.0),
            max_price: Some(101.0),
            last_price: Some(99.0),
            fallback_message: message.to_string(),
            last_updated: "2025-07-01 10:05:00".to_string(),
        }
    }

    fn record(interval: &str, message: &str) -> LogRecord {
        LogRecord::new(
            snapshot(interval, message),
            "2025-07-01 10:05:03".to_string(),
        )
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = SnapshotLog::new(dir.path().join("market.csv"));

        log.append(&record("10:00-10:15", "")).unwrap();
        log.append(&record("10:15-10:30", "")).unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], LOG_COLUMNS.join(","));
        assert!(lines[1].starts_with("10:00-10:15,10.5,"));
        assert!(lines[2].starts_with("10:15-10:30,"));
    }

    #[test]
    fn test_existing_empty_file_gets_header() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let log = SnapshotLog::new(file.path());

        log.append(&record("10:00-10:15", "")).unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert!(contents.starts_with("interval,traded_volume,"));
    }

    #[test]
    fn test_rows_round_trip_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let log = SnapshotLog::new(dir.path().join("market.csv"));
        let message = "No new data available after interval 10:00-10:15. Showing last known data from 09:45-10:00.";
        log.append(&record("09:45-10:00", message)).unwrap();

        let mut reader = csv::Reader::from_path(log.path()).unwrap();
        let rows: Vec<LogRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![record("09:45-10:00", message)]);
    }

    #[test]
    fn test_missing_values_are_blank_cells() {
        let dir = tempfile::tempdir().unwrap();
        let log = SnapshotLog::new(dir.path().join("market.csv"));
        let mut rec = record("10:00-10:15", "");
        rec.min_price = None;
        log.append(&rec).unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert!(contents.lines().nth(1).unwrap().contains("98.1,,101"));
    }

    #[tokio::test]
    async fn test_fetch_fails_until_first_publish() {
        let store = SnapshotStore::new();
        let url = serve(store.clone()).await;

        assert!(client(&url).fetch().await.is_err());

        let published = snapshot("10:00-10:15", "");
        store.publish(published.clone());

        assert_eq!(client(&url).fetch().await.unwrap(), published);
    }

    #[tokio::test]
    async fn test_unavailable_api_appends_nothing() {
        let store = SnapshotStore::new();
        let url = serve(store.clone()).await;
        let dir = tempfile::tempdir().unwrap();
        let log = SnapshotLog::new(dir.path().join("market.csv"));

        let polling = run_poller(client(&url), log.clone(), Duration::from_millis(20));
        let _ = tokio::time::timeout(Duration::from_millis(200), polling).await;
        assert!(!log.path().exists());

        store.publish(snapshot("10:00-10:15", ""));

        let polling = run_poller(client(&url), log.clone(), Duration::from_secs(60));
        let _ = tokio::time::timeout(Duration::from_millis(500), polling).await;

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().nth(1).unwrap().starts_with("10:00-10:15,"));
    }
}
