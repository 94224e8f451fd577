use crate::health::level::{HealthLevel, ThresholdSet};
use crate::health::rollup::{weighted_rate, ModelRollup};
use crate::types::HourlyRecord;
use serde::Serialize;

/// Cross-model counts for the overview cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_models: usize,
    pub healthy_models: usize,
    pub warning_models: usize,
    pub critical_models: usize,
    pub overall_rate: f64,
    pub total_success_slices: i64,
    pub total_slices: i64,
}

pub fn summarize(rollups: &[ModelRollup], thresholds: &ThresholdSet) -> Summary {
    let mut summary = Summary {
        total_models: rollups.len(),
        ..Summary::default()
    };

    for model in rollups {
        summary.total_success_slices += model.total_success;
        summary.total_slices += model.total_slices;
        match thresholds.classify(model.avg_rate) {
            level if level.is_healthy() => summary.healthy_models += 1,
            HealthLevel::Warning => summary.warning_models += 1,
            _ => summary.critical_models += 1,
        }
    }

    // Weighted across all slices, not a mean of per-model averages.
    summary.overall_rate = weighted_rate(summary.total_success_slices, summary.total_slices);
    summary
}

/// Statistics for a single model's trend over a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendStats {
    pub avg_rate: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    pub total_success: i64,
    pub total_slices: i64,
    pub total_requests: i64,
    pub error_requests: i64,
    pub success_requests: i64,
}

impl TrendStats {
    pub fn from_records(records: &[HourlyRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut stats = Self {
            min_rate: 1.0,
            ..Self::default()
        };
        for r in records {
            stats.total_success += r.success_slices;
            stats.total_slices += r.total_slices;
            stats.min_rate = stats.min_rate.min(r.success_rate);
            stats.max_rate = stats.max_rate.max(r.success_rate);
            stats.total_requests += r.total_requests;
            stats.error_requests += r.error_requests;
            stats.success_requests += r.success_requests;
        }
        stats.avg_rate = weighted_rate(stats.total_success, stats.total_slices);
        stats
    }
}
