use crate::health::{HealthLevel, HourCell, ModelRollup, Summary, ThresholdSet, TrendStats};
use crate::types::{FingerprintUser, HourlyRecord};
use serde::Serialize;

/// Operator view of one model over a chosen window.
#[derive(Debug, Default, Serialize)]
pub struct HourlyView {
    pub model_name: String,
    pub start_hour: i64,
    pub end_hour: i64,
    pub hours: Vec<i64>,
    pub rows: Vec<TrendPoint>,
    pub stats: TrendStats,
}

#[derive(Debug, Serialize)]
pub struct TrendPoint {
    #[serde(flatten)]
    pub record: HourlyRecord,
    pub level: HealthLevel,
    pub label: String,
}

impl TrendPoint {
    pub fn new(record: HourlyRecord, thresholds: &ThresholdSet) -> Self {
        let level = thresholds.classify(record.rate());
        Self {
            label: thresholds.label(level).to_string(),
            level,
            record,
        }
    }
}

/// Public heat-grid overview of every model.
#[derive(Debug, Default, Serialize)]
pub struct OverviewView {
    pub start_hour: i64,
    pub end_hour: i64,
    pub latest_hour: Option<i64>,
    pub hours: Vec<i64>,
    /// Computed over all models, before the search filter.
    pub stats: Summary,
    pub models: Vec<ModelCard>,
}

#[derive(Debug, Serialize)]
pub struct ModelCard {
    pub model_name: String,
    pub avg_rate: f64,
    pub total_success: i64,
    pub total_slices: i64,
    pub level: HealthLevel,
    pub label: String,
    pub hourly: Vec<CellView>,
}

#[derive(Debug, Serialize)]
pub struct CellView {
    #[serde(flatten)]
    pub cell: HourCell,
    pub level: HealthLevel,
}

impl ModelCard {
    pub fn new(rollup: ModelRollup, thresholds: &ThresholdSet) -> Self {
        let level = thresholds.classify(rollup.avg_rate);
        let hourly = rollup
            .hourly
            .into_iter()
            .map(|cell| CellView {
                level: thresholds.classify(cell.success_rate),
                cell,
            })
            .collect();
        Self {
            model_name: rollup.model_name,
            avg_rate: rollup.avg_rate,
            total_success: rollup.total_success,
            total_slices: rollup.total_slices,
            label: thresholds.label(level).to_string(),
            level,
            hourly,
        }
    }
}

/// Fingerprint admin row with display labels.
#[derive(Debug, Serialize)]
pub struct FingerprintRow {
    #[serde(flatten)]
    pub user: FingerprintUser,
    pub role_label: &'static str,
    pub status_label: &'static str,
}

impl From<FingerprintUser> for FingerprintRow {
    fn from(user: FingerprintUser) -> Self {
        let role_label = match user.role {
            100 => "root",
            10 => "admin",
            _ => "user",
        };
        let status_label = if user.status == 1 {
            "enabled"
        } else {
            "disabled"
        };
        Self {
            user,
            role_label,
            status_label,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ReportView {
    pub visitor_id: Option<String>,
}
