//! OTE Intraday - current trading interval service
//!
//! Refreshes the OTE intraday market report every quarter hour, resolves the
//! interval covering "now" in Prague time, and serves the latest snapshot at
//! `/api/data`.

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ote_intraday::{
    api::{create_router, AppState},
    clock::SystemClock,
    config::AppConfig,
    scheduler::RefreshScheduler,
    scrapers::OteSource,
    snapshot::SnapshotStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let config = AppConfig::from_env();
    let scheduler_config = config
        .scheduler_config()
        .context("Invalid refresh configuration")?;

    info!("🚀 OTE intraday service starting");
    info!(
        page = %config.source.page_url,
        timezone = %scheduler_config.timezone,
        "Report source configured"
    );

    let source = Arc::new(OteSource::new(config.source_config())?);
    let store = SnapshotStore::new();

    let scheduler = RefreshScheduler::new(
        source,
        store.clone(),
        Arc::new(SystemClock),
        scheduler_config,
    );
    let status = scheduler.status();
    scheduler.spawn();

    let app = create_router(AppState { store, status });

    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!("🎯 API server listening on {}", config.server.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ote_intraday=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // Also try the crate directory when launched from elsewhere.
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
