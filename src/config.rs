use crate::health::ThresholdSet;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub fingerprint: FingerprintConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    5340
}

/// Local SQLite file holding the fingerprint report state.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("modelpulse.db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Sent as a bearer token when set.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Sent as `New-Api-User` when set.
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default = "default_models_cache_ttl")]
    pub models_cache_ttl_secs: u64,
}

fn default_timeout() -> u64 {
    10
}
fn default_models_cache_ttl() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct FingerprintConfig {
    #[serde(default = "default_fingerprint_enabled")]
    pub enabled: bool,
    #[serde(default = "default_report_interval")]
    pub report_interval_ms: i64,
    #[serde(default = "default_report_on_startup")]
    pub report_on_startup: bool,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            enabled: default_fingerprint_enabled(),
            report_interval_ms: default_report_interval(),
            report_on_startup: default_report_on_startup(),
        }
    }
}

fn default_fingerprint_enabled() -> bool {
    true
}
fn default_report_interval() -> i64 {
    crate::fingerprint::DEFAULT_REPORT_INTERVAL_MS
}
fn default_report_on_startup() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThresholdsConfig {
    #[serde(default = "ThresholdSet::operator")]
    pub operator: ThresholdSet,
    #[serde(default = "ThresholdSet::public")]
    pub public: ThresholdSet,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            operator: ThresholdSet::operator(),
            public: ThresholdSet::public(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        let parsed = url::Url::parse(&self.upstream.base_url)
            .map_err(|e| format!("upstream.base_url is not a valid URL: {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!(
                "upstream.base_url must use http or https, got {}",
                parsed.scheme()
            ));
        }
        if self.upstream.timeout_secs == 0 {
            return Err("upstream.timeout_secs must be greater than zero".to_string());
        }
        if self.fingerprint.report_interval_ms <= 0 {
            return Err("fingerprint.report_interval_ms must be positive".to_string());
        }
        self.thresholds
            .operator
            .validate()
            .map_err(|e| format!("thresholds.operator: {e}"))?;
        self.thresholds
            .public
            .validate()
            .map_err(|e| format!("thresholds.public: {e}"))?;
        Ok(())
    }

    pub fn load(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        let path = config_path.unwrap_or("config.toml");
        builder = builder.add_source(File::with_name(path).required(false));

        // MODELPULSE__UPSTREAM__BASE_URL=https://..., etc.
        builder = builder.add_source(
            Environment::with_prefix("MODELPULSE")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
