//! HTTP boundary tests
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use ote_intraday::{
    api::{create_router, AppState},
    clock::ManualClock,
    scheduler::{RefreshScheduler, RetryPolicy, SchedulerConfig},
    scrapers::StaticSource,
    MetricFields, Row, RowTable, SnapshotStore,
};

fn scheduler(table: RowTable) -> RefreshScheduler {
    // 10:05 Prague time (CEST).
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 7, 1, 8, 5, 0).unwrap());
    RefreshScheduler::new(
        Arc::new(StaticSource::new(table)),
        SnapshotStore::new(),
        Arc::new(clock),
        SchedulerConfig {
            retry: RetryPolicy::new(2, Duration::from_secs(60)),
            fetch_timeout: Duration::from_secs(10),
            timezone: chrono_tz::Europe::Prague,
        },
    )
}

fn app(sched: &RefreshScheduler) -> Router {
    create_router(AppState {
        store: sched.store().clone(),
        status: sched.status(),
    })
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn data_is_unavailable_before_first_publish() {
    let sched = scheduler(RowTable::default());
    let (status, body) = get_json(app(&sched), "/api/data").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["detail"], "No data available yet");
}

#[tokio::test(start_paused = true)]
async fn data_serves_published_snapshot() {
    let sched = scheduler(RowTable::new(vec![
        Row::new("09:45-10:00", MetricFields::filled(1.0)),
        Row::from_cells("10:00-10:15", ["4", "2", "2", "101.5", "99", "104", "100"]),
    ]));
    sched.run_cycle().await;

    let (status, body) = get_json(app(&sched), "/api/data").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["interval"], "10:00-10:15");
    assert_eq!(body["weighted_average_price"], 101.5);
    assert_eq!(body["fallback_message"], "");
    assert_eq!(body["last_updated"], "2025-07-01 10:05:00");
}

#[tokio::test(start_paused = true)]
async fn failed_cycle_keeps_endpoint_unavailable_and_reports_status() {
    let sched = scheduler(RowTable::new(vec![Row::from_cells(
        "10:00-10:15",
        ["-", "-", "-", "-", "-", "-", "-"],
    )]));
    sched.run_cycle().await;

    let (status, _) = get_json(app(&sched), "/api/data").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = get_json(app(&sched), "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snapshot_available"], false);
    assert_eq!(body["scheduler"]["exhausted_cycles"], 1);
    assert!(body["scheduler"]["last_error"]
        .as_str()
        .unwrap()
        .contains("no complete row"));
}

#[tokio::test]
async fn health_reports_version() {
    let sched = scheduler(RowTable::default());
    let (status, body) = get_json(app(&sched), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
