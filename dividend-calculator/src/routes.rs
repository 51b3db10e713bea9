//! HTTP API routes.
//!
//! Every ticker route builds fresh entity models for the request, so the
//! only state shared between requests is the on-disk cache. Successful
//! responses are `{"status": "OK", "data": ...}` with an optional `title`.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::Instrument;

use dividend_common::logging::generate_trace_id;
use dividend_common::request_span;

use crate::data::{FinanceDataSource, PriceRecord};
use crate::error::ApiError;
use crate::screener::{Predicate, Screener, ScreenerError};
use crate::ticker::{
    BalanceSheet, CashFlow, CompanyProfile, DividendCalendar, Financial, IncomeStatement, Ratios,
    StatementTitle, Ticker, Valuation, DEFAULT_HOLD_YEARS, DEFAULT_ROR, MAX_HOLD_YEARS,
};

/// Price interval used when the request does not name one.
const DEFAULT_PRICE_INTERVAL: &str = "1mo";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn FinanceDataSource>,
    pub screener: Arc<Screener>,
}

impl AppState {
    pub fn new(source: Arc<dyn FinanceDataSource>, screener: Screener) -> Self {
        Self {
            source,
            screener: Arc::new(screener),
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Ticker ratios and profile
        .route("/api/v1/ticker/:symbol/ratios", get(get_ratios))
        .route("/api/v1/ticker/:symbol/company", get(get_company))
        .route("/api/v1/ticker/:symbol/dividends", get(get_dividends))
        .route("/api/v1/ticker/:symbol/valuation", get(get_valuation))
        .route("/api/v1/ticker/:symbol/calendar", get(get_calendar))
        .route("/api/v1/ticker/:symbol/prices", get(get_prices))
        // Financial statements
        .route(
            "/api/v1/ticker/:symbol/income-statements",
            get(get_income_statements),
        )
        .route("/api/v1/ticker/:symbol/balance-sheets", get(get_balance_sheets))
        .route("/api/v1/ticker/:symbol/cash-flows", get(get_cash_flows))
        // Search and screening
        .route("/api/v1/search", get(search))
        .route("/api/v1/screener/scrape", post(scrape))
        .route("/api/v1/screener/query", post(query))
        .with_state(state)
}

// ============ Response Envelope ============

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'static [StatementTitle]>,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        status: "OK",
        data,
        title: None,
    })
}

// ============ Health Check ============

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "dividend-calculator",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============ Ticker ============

async fn get_ratios(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<Ratios> {
    let span = request_span!(generate_trace_id(), route = "ratios", symbol = %symbol);
    async move {
        let ticker = Ticker::new(symbol, state.source);
        Ok(ok(ticker.ratios().await?))
    }
    .instrument(span)
    .await
}

async fn get_company(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<CompanyProfile> {
    let span = request_span!(generate_trace_id(), route = "company", symbol = %symbol);
    async move {
        let ticker = Ticker::new(symbol, state.source);
        Ok(ok(ticker.company().await?))
    }
    .instrument(span)
    .await
}

async fn get_dividends(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<BTreeMap<i32, f64>> {
    let span = request_span!(generate_trace_id(), route = "dividends", symbol = %symbol);
    async move {
        let ticker = Ticker::new(symbol, state.source);
        Ok(ok(ticker.dividends_per_year().await?))
    }
    .instrument(span)
    .await
}

#[derive(Debug, Deserialize)]
struct ValuationParams {
    ror: Option<f64>,
    hold_years: Option<u32>,
}

async fn get_valuation(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    params: Result<Query<ValuationParams>, QueryRejection>,
) -> ApiResult<Valuation> {
    let span = request_span!(generate_trace_id(), route = "valuation", symbol = %symbol);
    async move {
        let Query(params) = params.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
        let hold_years = params.hold_years.unwrap_or(DEFAULT_HOLD_YEARS);
        if hold_years > MAX_HOLD_YEARS {
            return Err(ApiError::InvalidRequest(format!(
                "hold_years must be at most {}",
                MAX_HOLD_YEARS
            )));
        }

        let ticker = Ticker::new(symbol, state.source);
        let valuation = ticker
            .valuation(params.ror.unwrap_or(DEFAULT_ROR), hold_years)
            .await?;
        Ok(ok(valuation))
    }
    .instrument(span)
    .await
}

async fn get_calendar(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<DividendCalendar> {
    let span = request_span!(generate_trace_id(), route = "calendar", symbol = %symbol);
    async move {
        let ticker = Ticker::new(symbol, state.source);
        Ok(ok(ticker.calendar().await?))
    }
    .instrument(span)
    .await
}

#[derive(Debug, Deserialize)]
struct PriceParams {
    interval: Option<String>,
}

async fn get_prices(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    params: Result<Query<PriceParams>, QueryRejection>,
) -> ApiResult<Vec<PriceRecord>> {
    let span = request_span!(generate_trace_id(), route = "prices", symbol = %symbol);
    async move {
        let Query(params) = params.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
        let interval = params
            .interval
            .unwrap_or_else(|| DEFAULT_PRICE_INTERVAL.to_string());
        Ok(ok(state.source.get_historic_prices(&symbol, &interval).await?))
    }
    .instrument(span)
    .await
}

// ============ Financial Statements ============

async fn get_income_statements(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<Option<Vec<IncomeStatement>>> {
    let span = request_span!(generate_trace_id(), route = "income-statements", symbol = %symbol);
    async move {
        let financial = Financial::new(symbol, state.source);
        let statements = financial.income_statements().await?;

        Ok(Json(ApiResponse {
            status: "OK",
            data: statements,
            title: Some(financial.income_statement_titles()),
        }))
    }
    .instrument(span)
    .await
}

async fn get_balance_sheets(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<Option<Vec<BalanceSheet>>> {
    let span = request_span!(generate_trace_id(), route = "balance-sheets", symbol = %symbol);
    async move {
        let financial = Financial::new(symbol, state.source);
        Ok(ok(financial.balance_sheets().await?))
    }
    .instrument(span)
    .await
}

async fn get_cash_flows(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<Option<Vec<CashFlow>>> {
    let span = request_span!(generate_trace_id(), route = "cash-flows", symbol = %symbol);
    async move {
        let financial = Financial::new(symbol, state.source);
        Ok(ok(financial.cash_flows().await?))
    }
    .instrument(span)
    .await
}

// ============ Search ============

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Vec<Value>> {
    let span = request_span!(generate_trace_id(), route = "search");
    async move {
        let Query(params) = params.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
        let query = params
            .q
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ApiError::InvalidRequest("query parameter `q` is required".into()))?;

        Ok(ok(state.source.search_ticker(&query).await?))
    }
    .instrument(span)
    .await
}

// ============ Screener ============

#[derive(Debug, Serialize)]
pub struct ScrapeResult {
    pub success: bool,
}

async fn scrape(State(state): State<AppState>) -> ApiResult<ScrapeResult> {
    let span = request_span!(generate_trace_id(), route = "screener-scrape");
    async move {
        let success = state.screener.scrape().await?;
        Ok(ok(ScrapeResult { success }))
    }
    .instrument(span)
    .await
}

async fn query(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Vec<String>> {
    let span = request_span!(generate_trace_id(), route = "screener-query");
    async move {
        let Json(body) = body.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
        let chain: Vec<Predicate> = serde_json::from_value(body)
            .map_err(|e| ScreenerError::InvalidQuery(e.to_string()))?;

        Ok(ok(state.screener.query(&chain).await?))
    }
    .instrument(span)
    .await
}
