//! OTE Poller Binary
//!
//! Polls the intraday service's `/api/data` endpoint and appends every
//! snapshot to a CSV log.
//!
//! Usage:
//!   ote-poller --api-url http://localhost:5000/api/data --csv electricity_market_data.csv
//!
//! Environment:
//!   POLLER_API_URL - Snapshot endpoint
//!   POLLER_CSV_PATH - Log file (default: electricity_market_data.csv)
//!   POLLER_INTERVAL_SECS - Seconds between polls (default: 900)

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use ote_intraday::poller::{run_poller, PollerClient, SnapshotLog};

#[derive(Parser, Debug)]
#[command(name = "ote-poller")]
#[command(about = "Poll the OTE intraday service and append snapshots to a CSV log")]
struct Args {
    /// Snapshot endpoint
    #[arg(long, env = "POLLER_API_URL", default_value = "http://localhost:5000/api/data")]
    api_url: String,

    /// CSV log path
    #[arg(long = "csv", env = "POLLER_CSV_PATH", default_value = "electricity_market_data.csv")]
    csv_path: String,

    /// Seconds between polls
    #[arg(long, env = "POLLER_INTERVAL_SECS", default_value = "900")]
    interval_secs: u64,

    /// HTTP timeout in seconds
    #[arg(long, env = "POLLER_TIMEOUT_SECS", default_value = "10")]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("ote_intraday=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    info!("Starting OTE poller");
    info!("  API: {}", args.api_url);
    info!("  CSV: {}", args.csv_path);
    info!("  Every: {}s", args.interval_secs);

    let client = PollerClient::new(args.api_url, Duration::from_secs(args.timeout_secs))?;
    let log = SnapshotLog::new(args.csv_path);

    run_poller(client, log, Duration::from_secs(args.interval_secs.max(1))).await
}
