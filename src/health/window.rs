use serde::Serialize;

/// Length of one hour bucket in seconds.
pub const HOUR_SECS: i64 = 3600;

/// Default dashboard range.
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Widest window accepted, 30 days of hour buckets.
pub const MAX_WINDOW_HOURS: i64 = 720;

/// Floor a UNIX-seconds timestamp to the start of its hour bucket.
pub fn floor_to_hour(ts: i64) -> i64 {
    ts.div_euclid(HOUR_SECS) * HOUR_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("hour bound {0} is not aligned to a whole hour")]
    NotAligned(i64),

    #[error("end hour {end} must be after start hour {start}")]
    Empty { start: i64, end: i64 },

    #[error("window {start}..{end} spans more than {max} hours", max = MAX_WINDOW_HOURS)]
    TooWide { start: i64, end: i64 },
}

/// Half-open range of hour buckets `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourWindow {
    start_hour: i64,
    end_hour: i64,
}

impl HourWindow {
    pub fn new(start_hour: i64, end_hour: i64) -> Result<Self, WindowError> {
        for bound in [start_hour, end_hour] {
            if bound % HOUR_SECS != 0 {
                return Err(WindowError::NotAligned(bound));
            }
        }
        if end_hour <= start_hour {
            return Err(WindowError::Empty {
                start: start_hour,
                end: end_hour,
            });
        }
        let max_span = MAX_WINDOW_HOURS * HOUR_SECS;
        if end_hour.checked_sub(start_hour).map_or(true, |span| span > max_span) {
            return Err(WindowError::TooWide {
                start: start_hour,
                end: end_hour,
            });
        }
        Ok(Self {
            start_hour,
            end_hour,
        })
    }

    /// The `hours` buckets up to and including the one containing `now`.
    pub fn last_hours(now: i64, hours: i64) -> Result<Self, WindowError> {
        let end_hour = floor_to_hour(now).saturating_add(HOUR_SECS);
        let span = hours.saturating_mul(HOUR_SECS);
        Self::new(end_hour.saturating_sub(span), end_hour)
    }

    /// Smallest window covering both timestamps, inclusive of the hour `end_ts` falls in.
    pub fn covering(start_ts: i64, end_ts: i64) -> Result<Self, WindowError> {
        Self::new(
            floor_to_hour(start_ts),
            floor_to_hour(end_ts).saturating_add(HOUR_SECS),
        )
    }

    pub fn start_hour(&self) -> i64 {
        self.start_hour
    }

    pub fn end_hour(&self) -> i64 {
        self.end_hour
    }

    /// Number of hour buckets; at least 1 and at most [`MAX_WINDOW_HOURS`].
    pub fn hour_count(&self) -> usize {
        ((self.end_hour - self.start_hour) / HOUR_SECS) as usize
    }

    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.start_hour && ts < self.end_hour
    }
}

/// Every hour boundary in the window, ascending. This is the x-axis shared by
/// the heat grids and the trend chart.
pub fn enumerate_hours(window: &HourWindow) -> Vec<i64> {
    (window.start_hour..window.end_hour)
        .step_by(HOUR_SECS as usize)
        .collect()
}
