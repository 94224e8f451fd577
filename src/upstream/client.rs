use crate::config::UpstreamConfig;
use crate::health::HourWindow;
use crate::types::{
    DuplicateVisitor, FingerprintUser, HourlyRecord, Page, PublicHourlyPayload,
    RecordFingerprintRequest,
};
use crate::upstream::models::decode_model_list;
use crate::upstream::UpstreamError;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Envelope as received, before `data` is checked against the expected shape.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

/// Typed client for the model gateway's REST API.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    user_id: Option<i64>,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            user_id: config.user_id,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(ref token) = self.access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(user_id) = self.user_id {
            builder = builder.header("New-Api-User", user_id.to_string());
        }
        builder
    }

    /// Send a request and unwrap the `{success, message, data}` envelope.
    async fn send(&self, builder: RequestBuilder) -> Result<Value, UpstreamError> {
        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        let envelope: RawEnvelope = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => return Err(UpstreamError::Status(status.as_u16())),
            Err(e) => return Err(UpstreamError::Shape(format!("invalid envelope: {e}"))),
        };

        if !envelope.success {
            return Err(UpstreamError::Backend(envelope.message));
        }
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }
        Ok(envelope.data)
    }

    /// GET /api/model_health/hourly
    pub async fn hourly_health(
        &self,
        model_name: &str,
        window: &HourWindow,
    ) -> Result<Vec<HourlyRecord>, UpstreamError> {
        let builder = self.request(Method::GET, "/api/model_health/hourly").query(&[
            ("model_name", model_name.to_string()),
            ("start_hour", window.start_hour().to_string()),
            ("end_hour", window.end_hour().to_string()),
        ]);
        let data = self.send(builder).await?;
        if !data.is_array() {
            return Err(UpstreamError::Shape(
                "expected an array of hourly records".to_string(),
            ));
        }
        decode(data, "hourly records")
    }

    /// GET /api/public/model_health/hourly_last24h
    pub async fn public_hourly_last24h(&self) -> Result<PublicHourlyPayload, UpstreamError> {
        let builder = self.request(Method::GET, "/api/public/model_health/hourly_last24h");
        let data = self.send(builder).await?;
        if !data.is_object() {
            return Err(UpstreamError::Shape(
                "expected an object with start_hour, end_hour and rows".to_string(),
            ));
        }
        decode(data, "public hourly payload")
    }

    /// GET /api/channel/models_enabled
    pub async fn enabled_models(&self) -> Result<Vec<String>, UpstreamError> {
        let builder = self.request(Method::GET, "/api/channel/models_enabled");
        let data = self.send(builder).await?;
        decode_model_list(data)
    }

    /// POST /api/fingerprint/record
    pub async fn record_fingerprint(&self, visitor_id: &str) -> Result<(), UpstreamError> {
        let builder = self
            .request(Method::POST, "/api/fingerprint/record")
            .json(&RecordFingerprintRequest {
                visitor_id: visitor_id.to_string(),
            });
        self.send(builder).await?;
        Ok(())
    }

    /// GET /api/fingerprint/ or /api/fingerprint/search when a keyword is given.
    pub async fn fingerprints(
        &self,
        keyword: &str,
        page: i64,
        page_size: i64,
    ) -> Result<Page<FingerprintUser>, UpstreamError> {
        let keyword = keyword.trim();
        let path = if keyword.is_empty() {
            "/api/fingerprint/"
        } else {
            "/api/fingerprint/search"
        };
        let builder = self.request(Method::GET, path).query(&[
            ("p", page.to_string()),
            ("page_size", page_size.to_string()),
            ("keyword", keyword.to_string()),
        ]);
        self.page(builder).await
    }

    /// GET /api/fingerprint/duplicates
    pub async fn duplicate_visitors(
        &self,
        page: i64,
        page_size: i64,
    ) -> Result<Page<DuplicateVisitor>, UpstreamError> {
        let builder = self
            .request(Method::GET, "/api/fingerprint/duplicates")
            .query(&[("p", page.to_string()), ("page_size", page_size.to_string())]);
        self.page(builder).await
    }

    /// GET /api/fingerprint/users: accounts sharing a visitor id, optionally
    /// narrowed to one IP.
    pub async fn users_by_visitor(
        &self,
        visitor_id: &str,
        ip: Option<&str>,
        page: i64,
        page_size: i64,
    ) -> Result<Page<FingerprintUser>, UpstreamError> {
        let mut query = vec![
            ("visitor_id", visitor_id.to_string()),
            ("p", page.to_string()),
            ("page_size", page_size.to_string()),
        ];
        if let Some(ip) = ip.filter(|ip| !ip.is_empty()) {
            query.push(("ip", ip.to_string()));
        }
        let builder = self
            .request(Method::GET, "/api/fingerprint/users")
            .query(&query);
        self.page(builder).await
    }

    async fn page<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Page<T>, UpstreamError> {
        let data = self.send(builder).await?;
        if data.is_null() {
            return Ok(Page::default());
        }
        if !data.is_object() {
            return Err(UpstreamError::Shape("expected a page object".to_string()));
        }
        decode(data, "page")
    }
}

fn decode<T: DeserializeOwned>(data: Value, what: &str) -> Result<T, UpstreamError> {
    serde_json::from_value(data).map_err(|e| UpstreamError::Shape(format!("{what}: {e}")))
}
