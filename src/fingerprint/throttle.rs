use crate::fingerprint::store::KvStore;
use crate::upstream::{UpstreamClient, UpstreamError};
use std::sync::Arc;

/// Last successful upload, milliseconds since the epoch as a decimal string.
pub const LAST_REPORT_KEY: &str = "fp_last_report";
/// Cached visitor id from the most recent collection.
pub const VISITOR_ID_KEY: &str = "fp_visitor_id";
/// Minimum gap between non-forced reports: one hour.
pub const DEFAULT_REPORT_INTERVAL_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    #[error("fingerprint collection unavailable: {0}")]
    Unavailable(String),

    #[error("fingerprint collection failed: {0}")]
    Failed(String),
}

/// Produces a device fingerprint.
#[async_trait::async_trait]
pub trait FingerprintCollector: Send + Sync {
    async fn collect(&self) -> Result<String, CollectionError>;
}

/// Uploads a visitor id to the backend.
#[async_trait::async_trait]
pub trait FingerprintReporter: Send + Sync {
    async fn report(&self, visitor_id: &str) -> Result<(), UpstreamError>;
}

#[async_trait::async_trait]
impl FingerprintReporter for UpstreamClient {
    async fn report(&self, visitor_id: &str) -> Result<(), UpstreamError> {
        self.record_fingerprint(visitor_id).await
    }
}

/// Whether a non-forced report is due. A missing or unparsable last report
/// time always makes a report due.
pub fn should_report(now_ms: i64, last_report: Option<&str>, interval_ms: i64) -> bool {
    match last_report.and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(last) => now_ms.saturating_sub(last) >= interval_ms,
        None => true,
    }
}

fn system_now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Collects the device fingerprint and reports it at most once per interval.
///
/// Concurrent calls are not serialized.
pub struct FingerprintThrottler {
    store: Arc<dyn KvStore>,
    collector: Arc<dyn FingerprintCollector>,
    reporter: Arc<dyn FingerprintReporter>,
    interval_ms: i64,
    clock: fn() -> i64,
}

impl FingerprintThrottler {
    pub fn new(
        store: Arc<dyn KvStore>,
        collector: Arc<dyn FingerprintCollector>,
        reporter: Arc<dyn FingerprintReporter>,
        interval_ms: i64,
    ) -> Self {
        Self {
            store,
            collector,
            reporter,
            interval_ms,
            clock: system_now_ms,
        }
    }

    /// Replace the wall clock (milliseconds since the epoch).
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Report the fingerprint when due (or when `force` is set) and return the
    /// visitor id.
    ///
    /// When no report is due the cached id is returned without collecting or
    /// uploading, so `Ok(None)` means nothing has been cached yet. Upload
    /// failures leave the last report time untouched so the next eligible call
    /// retries; they do not fail the call.
    pub async fn collect_and_report(
        &self,
        force: bool,
    ) -> Result<Option<String>, CollectionError> {
        let now = (self.clock)();

        if !force {
            let last_report = self.read(LAST_REPORT_KEY).await;
            if !should_report(now, last_report.as_deref(), self.interval_ms) {
                tracing::debug!("fingerprint report not due, using cached visitor id");
                return Ok(self.read(VISITOR_ID_KEY).await);
            }
        }

        let visitor_id = self.collector.collect().await?;

        if let Err(e) = self.store.set(VISITOR_ID_KEY, &visitor_id).await {
            tracing::warn!(error = %e, "failed to cache visitor id");
        }

        match self.reporter.report(&visitor_id).await {
            Ok(()) => {
                let reported_at = (self.clock)();
                if let Err(e) = self
                    .store
                    .set(LAST_REPORT_KEY, &reported_at.to_string())
                    .await
                {
                    tracing::warn!(error = %e, "failed to persist fingerprint report time");
                }
                tracing::info!(force, "fingerprint reported");
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "fingerprint report failed, will retry when next due");
            }
        }

        Ok(Some(visitor_id))
    }

    // Unreadable state counts as absent.
    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, key, "failed to read fingerprint state");
                None
            }
        }
    }
}
