use crate::types::HourlyRecord;
use serde::Serialize;
use std::collections::HashMap;

/// One hour of one model in a heat grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourCell {
    pub model_name: String,
    pub hour_start_ts: i64,
    pub success_slices: i64,
    pub total_slices: i64,
    pub success_requests: i64,
    pub error_requests: i64,
    pub total_requests: i64,
    pub success_rate: f64,
    /// Placeholder for an hour without data; carries the model's window average.
    pub is_filled: bool,
}

impl HourCell {
    fn real(record: &HourlyRecord) -> Self {
        Self {
            model_name: record.model_name.clone(),
            hour_start_ts: record.hour_start_ts,
            success_slices: record.success_slices,
            total_slices: record.total_slices,
            success_requests: record.success_requests,
            error_requests: record.error_requests,
            total_requests: record.total_requests,
            success_rate: record.success_rate,
            is_filled: false,
        }
    }

    fn filled(model_name: &str, hour_start_ts: i64, avg_rate: f64) -> Self {
        Self {
            model_name: model_name.to_string(),
            hour_start_ts,
            success_slices: 0,
            total_slices: 0,
            success_requests: 0,
            error_requests: 0,
            total_requests: 0,
            success_rate: avg_rate,
            is_filled: true,
        }
    }
}

/// Per-model aggregate over a window of hours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRollup {
    pub model_name: String,
    pub avg_rate: f64,
    pub total_success: i64,
    pub total_slices: i64,
    /// Most recent hour first.
    pub hourly: Vec<HourCell>,
}

/// Slice-weighted success rate; 0 when there are no slices.
pub fn weighted_rate(success: i64, slices: i64) -> f64 {
    if slices > 0 {
        success as f64 / slices as f64
    } else {
        0.0
    }
}

/// Group records by model and aggregate them over `hours`.
///
/// Models keep first-seen order before the final stable sort by
/// `total_success` descending. Duplicate records for the same model and hour
/// resolve to the last one. Records outside `hours` are ignored, but their
/// model still gets a rollup.
pub fn rollup(records: &[HourlyRecord], hours: &[i64]) -> Vec<ModelRollup> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_model: HashMap<&str, HashMap<i64, &HourlyRecord>> = HashMap::new();

    for record in records {
        let name = record.model_name.as_str();
        if name.is_empty() {
            continue;
        }
        by_model
            .entry(name)
            .or_insert_with(|| {
                order.push(name);
                HashMap::new()
            })
            .insert(record.hour_start_ts, record);
    }

    let mut rollups: Vec<ModelRollup> = order
        .into_iter()
        .map(|name| {
            let by_hour = &by_model[name];
            let present = |ts: &i64| by_hour.get(ts).copied().filter(|r| r.has_slices());

            let (total_success, total_slices) = hours
                .iter()
                .filter_map(present)
                .fold((0i64, 0i64), |(success, slices), r| {
                    (success + r.success_slices, slices + r.total_slices)
                });
            let avg_rate = weighted_rate(total_success, total_slices);

            let hourly = hours
                .iter()
                .rev()
                .map(|ts| match present(ts) {
                    Some(record) => HourCell::real(record),
                    None => HourCell::filled(name, *ts, avg_rate),
                })
                .collect();

            ModelRollup {
                model_name: name.to_string(),
                avg_rate,
                total_success,
                total_slices,
                hourly,
            }
        })
        .collect();

    rollups.sort_by(|a, b| b.total_success.cmp(&a.total_success));
    rollups
}

/// Case-insensitive substring match on the model name. A blank keyword
/// returns the input untouched.
pub fn filter_by_name(rollups: Vec<ModelRollup>, keyword: &str) -> Vec<ModelRollup> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return rollups;
    }
    let keyword = keyword.to_lowercase();
    rollups
        .into_iter()
        .filter(|m| m.model_name.to_lowercase().contains(&keyword))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::window::{enumerate_hours, HourWindow, HOUR_SECS};

    fn record(model: &str, hour: i64, success: i64, total: i64) -> HourlyRecord {
        HourlyRecord {
            model_name: model.to_string(),
            hour_start_ts: hour * HOUR_SECS,
            success_slices: success,
            total_slices: total,
            success_requests: success * 10,
            error_requests: (total - success) * 10,
            total_requests: total * 10,
            success_rate: weighted_rate(success, total),
        }
    }

    fn hours(start: i64, end: i64) -> Vec<i64> {
        enumerate_hours(&HourWindow::new(start * HOUR_SECS, end * HOUR_SECS).unwrap())
    }

    #[test]
    fn test_single_record_single_hour() {
        let result = rollup(&[record("gpt", 100, 8, 10)], &hours(100, 101));
        assert_eq!(result.len(), 1);
        let gpt = &result[0];
        assert_eq!(gpt.model_name, "gpt");
        assert_eq!(gpt.avg_rate, 0.8);
        assert_eq!(gpt.total_success, 8);
        assert_eq!(gpt.total_slices, 10);
        assert_eq!(gpt.hourly.len(), 1);
        let cell = &gpt.hourly[0];
        assert_eq!(cell.hour_start_ts, 100 * HOUR_SECS);
        assert_eq!(cell.success_slices, 8);
        assert_eq!(cell.total_slices, 10);
        assert!(!cell.is_filled);
    }

    #[test]
    fn test_gaps_filled_with_final_average() {
        let result = rollup(&[record("gpt", 101, 5, 5)], &hours(100, 103));
        let gpt = &result[0];
        assert_eq!(gpt.avg_rate, 1.0);
        assert_eq!(gpt.hourly.len(), 3);

        // Most recent first: hour 102, 101, 100.
        let ts: Vec<i64> = gpt.hourly.iter().map(|c| c.hour_start_ts).collect();
        assert_eq!(ts, vec![102 * HOUR_SECS, 101 * HOUR_SECS, 100 * HOUR_SECS]);

        for idx in [0, 2] {
            let cell = &gpt.hourly[idx];
            assert!(cell.is_filled);
            assert_eq!(cell.success_rate, 1.0);
            assert_eq!(cell.success_slices, 0);
            assert_eq!(cell.total_slices, 0);
        }
        assert!(!gpt.hourly[1].is_filled);
    }

    #[test]
    fn test_average_is_slice_weighted() {
        // 1/1 and 0/9: simple mean would be 0.5, weighted is 0.1.
        let result = rollup(
            &[record("gpt", 100, 1, 1), record("gpt", 101, 0, 9)],
            &hours(100, 102),
        );
        assert!((result[0].avg_rate - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_zero_success_bucket_with_data_is_real() {
        let result = rollup(
            &[record("gpt", 100, 0, 4), record("gpt", 101, 4, 4)],
            &hours(100, 102),
        );
        let cells = &result[0].hourly;
        assert!(cells.iter().all(|c| !c.is_filled));
        let zero = cells
            .iter()
            .find(|c| c.hour_start_ts == 100 * HOUR_SECS)
            .unwrap();
        assert_eq!(zero.success_rate, 0.0);
        assert_eq!(zero.total_slices, 4);
    }

    #[test]
    fn test_model_without_slices_is_all_filled() {
        let result = rollup(&[record("idle", 100, 0, 0)], &hours(100, 104));
        let idle = &result[0];
        assert_eq!(idle.avg_rate, 0.0);
        assert_eq!(idle.total_slices, 0);
        assert_eq!(idle.hourly.len(), 4);
        assert!(idle.hourly.iter().all(|c| c.is_filled && c.success_rate == 0.0));
    }

    #[test]
    fn test_records_outside_window_ignored_but_model_kept() {
        let result = rollup(&[record("old", 50, 9, 10)], &hours(100, 102));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].total_slices, 0);
        assert!(result[0].hourly.iter().all(|c| c.is_filled));
    }

    #[test]
    fn test_duplicate_hour_last_record_wins() {
        let result = rollup(
            &[record("gpt", 100, 1, 10), record("gpt", 100, 9, 10)],
            &hours(100, 101),
        );
        assert_eq!(result[0].total_success, 9);
        assert_eq!(result[0].total_slices, 10);
    }

    #[test]
    fn test_sorted_by_total_success_stable() {
        let records = vec![
            record("a", 100, 2, 2),
            record("b", 100, 7, 10),
            record("c", 100, 2, 4),
            record("d", 100, 0, 0),
        ];
        let names: Vec<String> = rollup(&records, &hours(100, 101))
            .into_iter()
            .map(|m| m.model_name)
            .collect();
        assert_eq!(names, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_empty_input_and_blank_names() {
        assert!(rollup(&[], &hours(100, 102)).is_empty());
        assert!(rollup(&[record("", 100, 1, 1)], &hours(100, 102)).is_empty());
    }

    #[test]
    fn test_rollup_is_idempotent() {
        let records = vec![
            record("a", 100, 3, 4),
            record("b", 101, 7, 10),
            record("a", 102, 1, 1),
        ];
        let window = hours(100, 103);
        assert_eq!(rollup(&records, &window), rollup(&records, &window));
    }

    #[test]
    fn test_filter_by_name() {
        let rollups = rollup(
            &[
                record("GPT-4o", 100, 1, 1),
                record("claude-3", 100, 1, 1),
                record("gpt-3.5", 100, 1, 1),
            ],
            &hours(100, 101),
        );

        assert_eq!(filter_by_name(rollups.clone(), ""), rollups);
        assert_eq!(filter_by_name(rollups.clone(), "   "), rollups);

        let gpt: Vec<String> = filter_by_name(rollups.clone(), " Gpt ")
            .into_iter()
            .map(|m| m.model_name)
            .collect();
        assert_eq!(gpt, vec!["GPT-4o", "gpt-3.5"]);

        assert!(filter_by_name(rollups, "gemini").is_empty());
    }
}
