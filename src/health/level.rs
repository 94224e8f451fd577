use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    Critical,
    Poor,
    Warning,
    Good,
    Excellent,
}

impl HealthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLevel::Excellent => "excellent",
            HealthLevel::Good => "good",
            HealthLevel::Warning => "warning",
            HealthLevel::Poor => "poor",
            HealthLevel::Critical => "critical",
        }
    }

    /// Excellent and good both count as healthy in summaries.
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthLevel::Excellent | HealthLevel::Good)
    }
}

impl std::fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display labels for each level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelLabels {
    pub excellent: String,
    pub good: String,
    pub warning: String,
    pub poor: String,
    pub critical: String,
}

impl LevelLabels {
    fn new(excellent: &str, good: &str, warning: &str, poor: &str, critical: &str) -> Self {
        Self {
            excellent: excellent.to_string(),
            good: good.to_string(),
            warning: warning.to_string(),
            poor: poor.to_string(),
            critical: critical.to_string(),
        }
    }
}

/// Minimum success rate for each level above critical, plus labels.
/// Anything below `poor` is critical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub excellent: f64,
    pub good: f64,
    pub warning: f64,
    pub poor: f64,
    pub labels: LevelLabels,
}

impl ThresholdSet {
    /// Stricter cut-offs used by the operator dashboard.
    pub fn operator() -> Self {
        Self {
            excellent: 0.99,
            good: 0.95,
            warning: 0.80,
            poor: 0.50,
            labels: LevelLabels::new("Excellent", "Good", "Warning", "Poor", "Critical"),
        }
    }

    /// Softer cut-offs used by the public overview.
    pub fn public() -> Self {
        Self {
            excellent: 0.95,
            good: 0.80,
            warning: 0.60,
            poor: 0.20,
            labels: LevelLabels::new("Excellent", "Good", "Fair", "Degraded", "Down"),
        }
    }

    /// Non-finite and out-of-range rates classify as a rate of 0.
    pub fn classify(&self, rate: f64) -> HealthLevel {
        let rate = if rate.is_finite() && (0.0..=1.0).contains(&rate) {
            rate
        } else {
            0.0
        };

        if rate >= self.excellent {
            HealthLevel::Excellent
        } else if rate >= self.good {
            HealthLevel::Good
        } else if rate >= self.warning {
            HealthLevel::Warning
        } else if rate >= self.poor {
            HealthLevel::Poor
        } else {
            HealthLevel::Critical
        }
    }

    pub fn label(&self, level: HealthLevel) -> &str {
        match level {
            HealthLevel::Excellent => &self.labels.excellent,
            HealthLevel::Good => &self.labels.good,
            HealthLevel::Warning => &self.labels.warning,
            HealthLevel::Poor => &self.labels.poor,
            HealthLevel::Critical => &self.labels.critical,
        }
    }

    /// Cut-offs must be strictly descending and inside [0, 1].
    pub fn validate(&self) -> Result<(), String> {
        let cuts = [self.excellent, self.good, self.warning, self.poor];
        if cuts.iter().any(|c| !c.is_finite() || !(0.0..=1.0).contains(c)) {
            return Err(format!("thresholds must lie within [0, 1], got {cuts:?}"));
        }
        if cuts.windows(2).any(|w| w[0] <= w[1]) {
            return Err(format!(
                "thresholds must be strictly descending (excellent > good > warning > poor), got {cuts:?}"
            ));
        }
        Ok(())
    }
}
