//! Device fingerprint reporting.
//!
//! A visitor id is collected and uploaded at most once per interval unless
//! forced. The last report time and the cached id live in a [`KvStore`].

pub mod machine;
pub mod store;
pub mod throttle;

pub use machine::MachineCollector;
pub use store::{KvStore, MemoryKvStore, SqliteKvStore};
pub use throttle::{
    should_report, CollectionError, FingerprintCollector, FingerprintReporter,
    FingerprintThrottler, DEFAULT_REPORT_INTERVAL_MS, LAST_REPORT_KEY, VISITOR_ID_KEY,
};
