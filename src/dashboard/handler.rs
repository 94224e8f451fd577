use crate::dashboard::views::{
    FingerprintRow, HourlyView, ModelCard, OverviewView, ReportView, TrendPoint,
};
use crate::dashboard::DashboardState;
use crate::error::{AppError, AppResult, LoggedJson, LoggedQuery};
use crate::health::window::{DEFAULT_WINDOW_HOURS, MAX_WINDOW_HOURS};
use crate::health::{enumerate_hours, filter_by_name, rollup, summarize, HourWindow, TrendStats};
use crate::types::{DuplicateVisitor, Envelope, HealthResponse, Page, PageParams};
use crate::upstream::UpstreamError;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MODELS_CACHE_KEY: &str = "models_enabled";

fn ok<T: Serialize>(data: T) -> Response {
    Json(Envelope::ok(data)).into_response()
}

/// Upstream failures still answer with a renderable empty view plus a notice.
fn degraded<T: Serialize + Default>(err: UpstreamError) -> Response {
    tracing::warn!(error = %err, kind = err.kind(), "upstream request failed");
    (
        err.status_code(),
        Json(Envelope::failed(err.notice(), T::default())),
    )
        .into_response()
}

/// GET /health
pub async fn health(State(state): State<Arc<DashboardState>>) -> Json<HealthResponse> {
    let db_ok = crate::storage::sqlite::ping(&state.pool).await;
    Json(HealthResponse {
        status: if db_ok { "ok" } else { "degraded" }.to_string(),
        db_ok,
    })
}

/// GET /v1/models - Enabled model names, cached briefly.
pub async fn enabled_models(State(state): State<Arc<DashboardState>>) -> Response {
    if let Some(models) = state.models_cache.get(MODELS_CACHE_KEY) {
        return ok(models);
    }
    match state.upstream.enabled_models().await {
        Ok(models) => {
            state
                .models_cache
                .insert(MODELS_CACHE_KEY.to_string(), models.clone());
            ok(models)
        }
        Err(e) => degraded::<Vec<String>>(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct HourlyParams {
    pub model_name: Option<String>,
    pub start_hour: Option<i64>,
    pub end_hour: Option<i64>,
    /// Arbitrary timestamps from a date-range picker, widened to whole hours.
    pub start_ts: Option<i64>,
    pub end_ts: Option<i64>,
    pub hours: Option<i64>,
}

impl HourlyParams {
    fn window(&self, now: i64) -> AppResult<HourWindow> {
        let window = match (self.start_hour, self.end_hour, self.start_ts, self.end_ts) {
            (Some(start), Some(end), None, None) => HourWindow::new(start, end)?,
            (None, None, Some(start), Some(end)) => HourWindow::covering(start, end)?,
            (None, None, None, None) => {
                let hours = self
                    .hours
                    .unwrap_or(DEFAULT_WINDOW_HOURS)
                    .clamp(1, MAX_WINDOW_HOURS);
                HourWindow::last_hours(now, hours)?
            }
            _ => {
                return Err(AppError::Validation(
                    "give either start_hour and end_hour or start_ts and end_ts".to_string(),
                ))
            }
        };
        Ok(window)
    }
}

/// GET /v1/model_health/hourly - One model's hourly trend for the operator view.
pub async fn hourly(
    State(state): State<Arc<DashboardState>>,
    LoggedQuery(params): LoggedQuery<HourlyParams>,
) -> AppResult<Response> {
    let model_name = params
        .model_name
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::Validation("model_name is required".to_string()))?
        .to_string();
    let window = params.window(chrono::Utc::now().timestamp())?;

    let records = match state.upstream.hourly_health(&model_name, &window).await {
        Ok(records) => records,
        Err(e) => return Ok(degraded::<HourlyView>(e)),
    };

    tracing::debug!(model = %model_name, rows = records.len(), "hourly health fetched");

    let thresholds = &state.thresholds.operator;
    let stats = TrendStats::from_records(&records);
    let rows = records
        .into_iter()
        .map(|r| TrendPoint::new(r, thresholds))
        .collect();

    Ok(ok(HourlyView {
        model_name,
        start_hour: window.start_hour(),
        end_hour: window.end_hour(),
        hours: enumerate_hours(&window),
        rows,
        stats,
    }))
}

#[derive(Debug, Deserialize)]
pub struct OverviewParams {
    #[serde(default)]
    pub search: String,
}

/// GET /v1/public/model_health - Last 24h heat grid for every model.
pub async fn public_overview(
    State(state): State<Arc<DashboardState>>,
    LoggedQuery(params): LoggedQuery<OverviewParams>,
) -> Response {
    let payload = match state.upstream.public_hourly_last24h().await {
        Ok(payload) => payload,
        Err(e) => return degraded::<OverviewView>(e),
    };
    let window = match HourWindow::new(payload.start_hour, payload.end_hour) {
        Ok(window) => window,
        Err(e) => return degraded::<OverviewView>(UpstreamError::Shape(format!("window: {e}"))),
    };

    let thresholds = &state.thresholds.public;
    let hours = enumerate_hours(&window);
    let rollups = rollup(&payload.rows, &hours);
    let stats = summarize(&rollups, thresholds);
    let models = filter_by_name(rollups, &params.search)
        .into_iter()
        .map(|m| ModelCard::new(m, thresholds))
        .collect();

    ok(OverviewView {
        start_hour: window.start_hour(),
        end_hour: window.end_hour(),
        latest_hour: hours.last().copied(),
        hours,
        stats,
        models,
    })
}

#[derive(Debug, Deserialize)]
pub struct FingerprintListParams {
    #[serde(default)]
    pub keyword: String,
    pub p: Option<i64>,
    pub page_size: Option<i64>,
}

fn into_rows(page: Page<crate::types::FingerprintUser>) -> Page<FingerprintRow> {
    Page {
        page: page.page,
        page_size: page.page_size,
        total: page.total,
        items: page.items.into_iter().map(FingerprintRow::from).collect(),
    }
}

/// GET /v1/fingerprints - All recorded fingerprints, or a keyword search over
/// visitor id, username and email.
pub async fn fingerprints(
    State(state): State<Arc<DashboardState>>,
    LoggedQuery(params): LoggedQuery<FingerprintListParams>,
) -> Response {
    let page = PageParams {
        p: params.p,
        page_size: params.page_size,
    };
    match state
        .upstream
        .fingerprints(&params.keyword, page.page(), page.page_size())
        .await
    {
        Ok(page) => ok(into_rows(page)),
        Err(e) => degraded::<Page<FingerprintRow>>(e),
    }
}

/// GET /v1/fingerprints/duplicates - Visitor id + IP pairs shared by several users.
pub async fn duplicate_fingerprints(
    State(state): State<Arc<DashboardState>>,
    LoggedQuery(params): LoggedQuery<PageParams>,
) -> Response {
    match state
        .upstream
        .duplicate_visitors(params.page(), params.page_size())
        .await
    {
        Ok(page) => ok(page),
        Err(e) => degraded::<Page<DuplicateVisitor>>(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct FingerprintUsersParams {
    pub visitor_id: Option<String>,
    pub ip: Option<String>,
    pub p: Option<i64>,
    pub page_size: Option<i64>,
}

/// GET /v1/fingerprints/users - Accounts that share a visitor id.
pub async fn fingerprint_users(
    State(state): State<Arc<DashboardState>>,
    LoggedQuery(params): LoggedQuery<FingerprintUsersParams>,
) -> AppResult<Response> {
    let visitor_id = params
        .visitor_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("visitor_id is required".to_string()))?;

    let page = PageParams {
        p: params.p,
        page_size: params.page_size,
    };
    let result = state
        .upstream
        .users_by_visitor(
            visitor_id,
            params.ip.as_deref().map(str::trim),
            page.page(),
            page.page_size(),
        )
        .await;

    Ok(match result {
        Ok(page) => ok(into_rows(page)),
        Err(e) => degraded::<Page<FingerprintRow>>(e),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub force: bool,
}

/// POST /v1/fingerprint/report - Run the throttled fingerprint report.
///
/// Collection failures are logged and answered with a null visitor id.
pub async fn report_fingerprint(
    State(state): State<Arc<DashboardState>>,
    body: Option<LoggedJson<ReportRequest>>,
) -> AppResult<Json<Envelope<ReportView>>> {
    let throttler = state
        .throttler
        .as_ref()
        .ok_or_else(|| AppError::NotFound("fingerprint reporting is disabled".to_string()))?;
    let request = body.map(|LoggedJson(r)| r).unwrap_or_default();

    let visitor_id = match throttler.collect_and_report(request.force).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "fingerprint collection failed");
            None
        }
    };

    Ok(Json(Envelope::ok(ReportView { visitor_id })))
}
