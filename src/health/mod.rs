//! Hourly model health aggregation.
//!
//! Everything here is a pure function of already-fetched records: the same
//! records and window always produce the same rollups, levels and summaries.

pub mod level;
pub mod rollup;
pub mod summary;
pub mod window;

pub use level::{HealthLevel, LevelLabels, ThresholdSet};
pub use rollup::{filter_by_name, rollup, weighted_rate, HourCell, ModelRollup};
pub use summary::{summarize, Summary, TrendStats};
pub use window::{
    enumerate_hours, floor_to_hour, HourWindow, WindowError, HOUR_SECS, MAX_WINDOW_HOURS,
};
