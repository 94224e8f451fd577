use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

use modelpulse::config::{DatabaseConfig, UpstreamConfig};
use modelpulse::fingerprint::{
    FingerprintThrottler, KvStore, MachineCollector, SqliteKvStore, LAST_REPORT_KEY,
    VISITOR_ID_KEY,
};
use modelpulse::upstream::UpstreamClient;

const INTERVAL_MS: i64 = 3_600_000;

struct Backend {
    uploads: AtomicUsize,
    accept: AtomicBool,
}

async fn spawn_backend(backend: Arc<Backend>) -> SocketAddr {
    let app = Router::new()
        .route(
            "/api/fingerprint/record",
            post(|State(b): State<Arc<Backend>>, Json(body): Json<Value>| async move {
                assert!(body["visitor_id"].is_string());
                b.uploads.fetch_add(1, Ordering::SeqCst);
                if b.accept.load(Ordering::SeqCst) {
                    Json(json!({ "success": true, "message": "", "data": null }))
                } else {
                    Json(json!({ "success": false, "message": "rate limited", "data": null }))
                }
            }),
        )
        .with_state(backend);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn store_at(path: &Path) -> Arc<SqliteKvStore> {
    let pool = modelpulse::storage::sqlite::create_pool(&DatabaseConfig {
        path: path.to_path_buf(),
    })
    .unwrap();
    modelpulse::storage::sqlite::init_pool(&pool).await.unwrap();
    Arc::new(SqliteKvStore::new(pool))
}

fn throttler(
    store: Arc<SqliteKvStore>,
    machine_id: &Path,
    addr: SocketAddr,
    clock: fn() -> i64,
) -> FingerprintThrottler {
    let client = UpstreamClient::new(&UpstreamConfig {
        base_url: format!("http://{addr}"),
        timeout_secs: 5,
        access_token: None,
        user_id: None,
        models_cache_ttl_secs: 60,
    })
    .unwrap();
    FingerprintThrottler::new(
        store,
        Arc::new(MachineCollector::with_machine_id_paths(vec![
            machine_id.to_path_buf()
        ])),
        Arc::new(client),
        INTERVAL_MS,
    )
    .with_clock(clock)
}

fn t0() -> i64 {
    1_700_000_000_000
}

fn t0_plus_half_hour() -> i64 {
    t0() + INTERVAL_MS / 2
}

fn t0_plus_interval() -> i64 {
    t0() + INTERVAL_MS + 1
}

#[tokio::test]
async fn test_report_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("state.db");
    let machine_id = dir.path().join("machine-id");
    std::fs::write(&machine_id, "0f1e2d3c4b5a69788796a5b4c3d2e1f0\n").unwrap();

    let backend = Arc::new(Backend {
        uploads: AtomicUsize::new(0),
        accept: AtomicBool::new(true),
    });
    let addr = spawn_backend(backend.clone()).await;

    let first = throttler(store_at(&db).await, &machine_id, addr, t0);
    let visitor_id = first.collect_and_report(false).await.unwrap().unwrap();
    assert_eq!(backend.uploads.load(Ordering::SeqCst), 1);

    // A fresh process reading the same state file is still inside the interval
    let store = store_at(&db).await;
    assert_eq!(
        store.get(LAST_REPORT_KEY).await.unwrap(),
        Some(t0().to_string())
    );
    assert_eq!(store.get(VISITOR_ID_KEY).await.unwrap(), Some(visitor_id.clone()));

    let second = throttler(store.clone(), &machine_id, addr, t0_plus_half_hour);
    assert_eq!(
        second.collect_and_report(false).await.unwrap(),
        Some(visitor_id.clone())
    );
    assert_eq!(backend.uploads.load(Ordering::SeqCst), 1);

    let third = throttler(store, &machine_id, addr, t0_plus_interval);
    assert_eq!(
        third.collect_and_report(false).await.unwrap(),
        Some(visitor_id)
    );
    assert_eq!(backend.uploads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rejected_upload_retries_next_call() {
    let dir = tempfile::tempdir().unwrap();
    let machine_id = dir.path().join("machine-id");
    std::fs::write(&machine_id, "a1b2c3d4\n").unwrap();

    let backend = Arc::new(Backend {
        uploads: AtomicUsize::new(0),
        accept: AtomicBool::new(false),
    });
    let addr = spawn_backend(backend.clone()).await;
    let store = store_at(&dir.path().join("state.db")).await;
    let throttler = throttler(store.clone(), &machine_id, addr, t0);

    // The id is still returned, but no report time is recorded
    let visitor_id = throttler.collect_and_report(false).await.unwrap();
    assert!(visitor_id.is_some());
    assert_eq!(store.get(LAST_REPORT_KEY).await.unwrap(), None);

    backend.accept.store(true, Ordering::SeqCst);
    assert_eq!(throttler.collect_and_report(false).await.unwrap(), visitor_id);
    assert_eq!(backend.uploads.load(Ordering::SeqCst), 2);
    assert!(store.get(LAST_REPORT_KEY).await.unwrap().is_some());
}
