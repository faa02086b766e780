//! HTTP routes for the screener service.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use std::sync::Arc;

use screener_common::util::round_to;
use screener_common::Error;

use crate::data::{CompanyProfile, OutputSize, ProviderError, Quote};
use crate::indicators::IndicatorSet;
use crate::screener::{ScreenReport, ScreenRequest};
use crate::ScreenerState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
    pub provider: String,
}

/// Error body shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalsResponse {
    pub symbol: String,
    pub rsi: Option<f64>,
    #[serde(rename = "distanceFromMA50")]
    pub distance_from_ma50: Option<f64>,
    #[serde(rename = "distanceFromMA200")]
    pub distance_from_ma200: Option<f64>,
    pub ma50: Option<f64>,
    pub ma200: Option<f64>,
    /// Latest close
    pub current_price: f64,
}

#[derive(Debug, Serialize)]
pub struct ScreenResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: ScreenReport,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn api_error(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn status_of(err: &Error) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// 404 for "not found", 500 for every other provider failure.
fn lookup_error(
    err: ProviderError,
    symbol: &str,
    not_found: &str,
    failed: &str,
) -> (StatusCode, Json<ErrorResponse>) {
    let err = Error::from(err).with_context(format!("lookup for {}", symbol));
    let status = status_of(&err);

    if err.is_not_found() {
        tracing::debug!(symbol, "Lookup found nothing");
        api_error(status, not_found)
    } else {
        tracing::error!(symbol, error = %err, "Lookup failed");
        api_error(status, failed)
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint
pub async fn health(State(state): State<Arc<ScreenerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "Stock Screener API is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: state.market.provider_name().to_string(),
    })
}

/// Current quote for one symbol
pub async fn get_quote(
    State(state): State<Arc<ScreenerState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Quote> {
    let sequencer = state.market.sequencer();

    state
        .market
        .quote(&sequencer, &symbol)
        .await
        .map(Json)
        .map_err(|e| lookup_error(e, &symbol, "Symbol not found", "Failed to fetch quote"))
}

/// RSI and moving-average distances from the full daily history
pub async fn get_technicals(
    State(state): State<Arc<ScreenerState>>,
    Path(symbol): Path<String>,
) -> ApiResult<TechnicalsResponse> {
    let sequencer = state.market.sequencer();

    let series = state
        .market
        .history(&sequencer, &symbol, OutputSize::Full)
        .await
        .map_err(|e| {
            lookup_error(
                e,
                &symbol,
                "Technical data not found",
                "Failed to fetch technical data",
            )
        })?;

    let Some(current_price) = series.latest() else {
        return Err(api_error(StatusCode::NOT_FOUND, "Technical data not found"));
    };

    let indicators = IndicatorSet::compute(
        current_price,
        &series,
        state.config.screener.moving_average_mode,
    );

    Ok(Json(TechnicalsResponse {
        symbol,
        rsi: indicators.rounded_rsi(),
        distance_from_ma50: indicators.distance_from_ma50,
        distance_from_ma200: indicators.distance_from_ma200,
        ma50: indicators.ma50,
        ma200: indicators.ma200,
        current_price: round_to(current_price, 2),
    }))
}

/// Company overview for one symbol
pub async fn get_overview(
    State(state): State<Arc<ScreenerState>>,
    Path(symbol): Path<String>,
) -> ApiResult<CompanyProfile> {
    let sequencer = state.market.sequencer();

    state
        .market
        .profile(&sequencer, &symbol)
        .await
        .map(Json)
        .map_err(|e| lookup_error(e, &symbol, "Company not found", "Failed to fetch overview"))
}

/// Run a screen
pub async fn screen(
    State(state): State<Arc<ScreenerState>>,
    Json(request): Json<ScreenRequest>,
) -> ApiResult<ScreenResponse> {
    match state.engine.screen(&request).await {
        Ok(report) => Ok(Json(ScreenResponse {
            success: true,
            report,
        })),
        Err(e) => {
            let err = Error::from(e);
            let status = status_of(&err);

            if status.is_client_error() {
                tracing::warn!(error = %err, "Rejected screening request");
                Err(api_error(status, &err.to_string()))
            } else {
                tracing::error!(error = %err, "Screening failed");
                Err(api_error(status, "Screening failed"))
            }
        }
    }
}
