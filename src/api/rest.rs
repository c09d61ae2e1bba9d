// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/` and are read-only. Engine errors map to
// HTTP statuses at this boundary:
//
//   DataUnavailable                        -> 404
//   InvalidPeriod, invalid query params    -> 400
//   UnsupportedGranularity, sequencing     -> 500
//   upstream failure (current funding)     -> 502
//
// Error bodies are `{"error": "<message>"}`, including axum's own query
// rejections. A granularity named by the caller (`/candles`) is client input
// and rejected with 400 before any upstream call.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::analysis::Report;
use crate::app_state::AppState;
use crate::error::AnalysisError;
use crate::futures_intel::DEFAULT_SPIKE_THRESHOLD_PCT;
use crate::market_data::{Granularity, Series};
use crate::types::FundingEvent;

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MIN_HISTORY_LIMIT: usize = 10;
const MAX_HISTORY_LIMIT: usize = 500;
/// Widest window `/candles` will walk, in bars.
const MAX_CANDLE_BARS: i64 = 5_000;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
}

/// Unwrap a query extractor; malformed parameters become a JSON 400.
fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| error_response(StatusCode::BAD_REQUEST, rejection.body_text()))
}

fn status_for(err: &AnalysisError) -> StatusCode {
    match err {
        AnalysisError::DataUnavailable { .. } => StatusCode::NOT_FOUND,
        AnalysisError::InvalidPeriod(_) => StatusCode::BAD_REQUEST,
        AnalysisError::UnsupportedGranularity(_)
        | AnalysisError::SeriesNotPopulated { .. }
        | AnalysisError::InsufficientDataPoints { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/errors", get(recent_errors))
        .route("/api/v1/analysis/:symbol", get(analysis))
        .route("/api/v1/funding-rate/history/:symbol", get(funding_history))
        .route("/api/v1/funding-rate/spikes/:symbol", get(funding_spikes))
        .route("/api/v1/funding-rate/current/:symbol", get(funding_current))
        .route("/api/v1/funding-rate/interval/:symbol", get(funding_interval))
        .route("/api/v1/price/:symbol", get(price))
        .route("/api/v1/candles/:symbol", get(candles))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
    uptime_secs: u64,
    upstream: String,
    product_type: String,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        server_time: Utc::now().timestamp_millis(),
        uptime_secs: state.uptime_secs(),
        upstream: state.runtime_config.base_url.clone(),
        product_type: state.runtime_config.product_type.clone(),
    };
    Json(resp)
}

async fn recent_errors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let errors = state.recent_errors.read().clone();
    Json(errors)
}

// =============================================================================
// Analysis
// =============================================================================

#[derive(Deserialize)]
struct PeriodQuery {
    /// Anchor period, epoch milliseconds; defaults to now.
    period: Option<i64>,
}

impl PeriodQuery {
    fn period_or_now(&self) -> i64 {
        self.period
            .unwrap_or_else(|| Utc::now().timestamp_millis())
    }
}

async fn analysis(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> Result<Json<Report>, ApiError> {
    let query = query_params(query)?;
    let symbol = symbol.to_uppercase();
    let period = query.period_or_now();

    match state.analyzer.analyze(&symbol, period).await {
        Ok(report) => {
            let served = state.record_analysis();
            info!(symbol = %symbol, period, served, "analysis served");
            Ok(Json(report))
        }
        Err(e) if e.is_hard() => {
            error!(symbol = %symbol, period, error = %e, "analysis failed");
            state.push_error(e.to_string(), Some(&symbol));
            Err(error_response(status_for(&e), e.to_string()))
        }
        Err(e) => {
            warn!(symbol = %symbol, period, error = %e, "analysis incomplete");
            state.push_error(e.to_string(), Some(&symbol));
            Err(error_response(status_for(&e), e.to_string()))
        }
    }
}

// =============================================================================
// Funding rate
// =============================================================================

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn funding_history(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<FundingEvent>>, ApiError> {
    let query = query_params(query)?;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(MIN_HISTORY_LIMIT..MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("limit must be in [{MIN_HISTORY_LIMIT}, {MAX_HISTORY_LIMIT}), got {limit}"),
        ));
    }

    let symbol = symbol.to_uppercase();
    let mut events = state.funding().history(&symbol).await;
    events.truncate(limit);
    Ok(Json(events))
}

#[derive(Deserialize)]
struct SpikesQuery {
    /// Minimum |rate| in percent.
    threshold: Option<f64>,
}

async fn funding_spikes(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    query: Result<Query<SpikesQuery>, QueryRejection>,
) -> Result<Json<Vec<FundingEvent>>, ApiError> {
    let query = query_params(query)?;
    let threshold = query.threshold.unwrap_or(DEFAULT_SPIKE_THRESHOLD_PCT);
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("threshold must be a non-negative number, got {threshold}"),
        ));
    }

    let symbol = symbol.to_uppercase();
    Ok(Json(state.funding().spikes(&symbol, threshold).await))
}

#[derive(Serialize)]
struct CurrentRateResponse {
    symbol: String,
    rate_pct: f64,
}

async fn funding_current(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<CurrentRateResponse>, ApiError> {
    let symbol = symbol.to_uppercase();
    match state.funding().current_rate(&symbol).await {
        Ok(rate_pct) => Ok(Json(CurrentRateResponse { symbol, rate_pct })),
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "current funding rate unavailable");
            Err(error_response(StatusCode::BAD_GATEWAY, format!("{e:#}")))
        }
    }
}

async fn funding_interval(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let symbol = symbol.to_uppercase();
    let interval = state
        .funding()
        .funding_interval(&symbol)
        .await
        .map_err(|e| error_response(status_for(&e), e.to_string()))?;
    Ok(Json(interval))
}

// =============================================================================
// Price of period
// =============================================================================

#[derive(Serialize)]
struct PriceResponse {
    symbol: String,
    period: i64,
    price: f64,
}

async fn price(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> Result<Json<PriceResponse>, ApiError> {
    let query = query_params(query)?;
    let symbol = symbol.to_uppercase();
    let period = query.period_or_now();
    let price = state
        .analyzer
        .price_at(&symbol, period)
        .await
        .map_err(|e| error_response(status_for(&e), e.to_string()))?;
    Ok(Json(PriceResponse {
        symbol,
        period,
        price,
    }))
}

// =============================================================================
// Candles
// =============================================================================

#[derive(Deserialize)]
struct CandlesQuery {
    /// Upstream identifier, e.g. `1m`, `4H`, `1W`.
    granularity: String,
    start: i64,
    end: i64,
}

async fn candles(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    query: Result<Query<CandlesQuery>, QueryRejection>,
) -> Result<Json<Series>, ApiError> {
    let query = query_params(query)?;
    let granularity = query
        .granularity
        .parse::<Granularity>()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;

    let representable = |ms: i64| DateTime::<Utc>::from_timestamp_millis(ms).is_some();
    if !representable(query.start) || !representable(query.end) || query.end <= query.start {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("invalid window [{}, {})", query.start, query.end),
        ));
    }
    let bars = (query.end - query.start) / granularity.as_millis();
    if bars > MAX_CANDLE_BARS {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("window spans {bars} bars, at most {MAX_CANDLE_BARS} allowed"),
        ));
    }

    let symbol = symbol.to_uppercase();
    let series = state
        .candles()
        .fetch_series(&symbol, granularity, query.start, query.end)
        .await;
    if series.is_empty() {
        let e = AnalysisError::unavailable("candle", symbol.as_str());
        return Err(error_response(status_for(&e), e.to_string()));
    }
    Ok(Json(series))
}
