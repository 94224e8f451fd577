use serde::{Deserialize, Deserializer, Serialize};

/// Response envelope used by the upstream API and mirrored by the dashboard.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: String::new(),
            data,
        }
    }

    pub fn failed(message: impl Into<String>, data: T) -> Self {
        Self {
            success: false,
            message: message.into(),
            data,
        }
    }
}

/// One model's health counters for one hour bucket, as served by the upstream.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HourlyRecord {
    pub model_name: String,
    pub hour_start_ts: i64,
    #[serde(default)]
    pub success_slices: i64,
    #[serde(default)]
    pub total_slices: i64,
    #[serde(default)]
    pub success_requests: i64,
    #[serde(default)]
    pub error_requests: i64,
    #[serde(default)]
    pub total_requests: i64,
    #[serde(default)]
    pub success_rate: f64,
}

impl HourlyRecord {
    pub fn has_slices(&self) -> bool {
        self.total_slices > 0
    }

    /// Success rate recomputed from slices when possible.
    pub fn rate(&self) -> f64 {
        if self.has_slices() {
            self.success_slices as f64 / self.total_slices as f64
        } else {
            self.success_rate
        }
    }
}

/// `data` of the public last-24h endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublicHourlyPayload {
    pub start_hour: i64,
    pub end_hour: i64,
    #[serde(default)]
    pub rows: Vec<HourlyRecord>,
}

/// Paginated listing as returned by the upstream admin endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub page_size: i64,
    #[serde(default)]
    pub total: i64,
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub items: Vec<T>,
}

// The upstream encodes an empty listing as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 0,
            total: 0,
            items: Vec::new(),
        }
    }
}

/// Pagination parameters forwarded to the upstream (`p` is 1-based).
#[derive(Debug, Clone, Deserialize)]
pub struct PageParams {
    pub p: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.p.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size.unwrap_or(20).clamp(1, 100)
    }
}

/// A user account together with one of its recorded device fingerprints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FingerprintUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub role: i64,
    #[serde(default)]
    pub quota: i64,
    #[serde(default)]
    pub used_quota: i64,
    #[serde(default)]
    pub request_count: i64,
    pub visitor_id: String,
    #[serde(default)]
    pub record_time: String,
    #[serde(default)]
    pub ip: String,
}

/// A visitor id + IP pair shared by more than one user.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DuplicateVisitor {
    pub visitor_id: String,
    #[serde(default)]
    pub ip: String,
    pub user_count: i64,
    #[serde(default)]
    pub last_seen: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordFingerprintRequest {
    pub visitor_id: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub db_ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hourly_record_defaults_missing_counters() {
        let record: HourlyRecord =
            serde_json::from_str(r#"{"model_name":"gpt","hour_start_ts":3600}"#).unwrap();
        assert_eq!(record.total_slices, 0);
        assert_eq!(record.success_rate, 0.0);
        assert!(!record.has_slices());
    }

    #[test]
    fn test_rate_prefers_slices() {
        let record = HourlyRecord {
            model_name: "gpt".into(),
            hour_start_ts: 3600,
            success_slices: 3,
            total_slices: 4,
            success_requests: 0,
            error_requests: 0,
            total_requests: 0,
            success_rate: 0.1,
        };
        assert_eq!(record.rate(), 0.75);
    }

    #[test]
    fn test_page_params_clamp() {
        let params = PageParams {
            p: Some(0),
            page_size: Some(1000),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), 100);
    }

    #[test]
    fn test_page_tolerates_missing_items() {
        let page: Page<DuplicateVisitor> = serde_json::from_str(r#"{"total":0}"#).unwrap();
        assert!(page.items.is_empty());

        let page: Page<DuplicateVisitor> =
            serde_json::from_str(r#"{"total":0,"items":null}"#).unwrap();
        assert!(page.items.is_empty());
    }
}
