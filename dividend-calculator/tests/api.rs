//! End-to-end tests of the HTTP API over a mock data source.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Datelike, TimeZone, Utc};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use dividend_calculator::data::{DataError, DividendRecord, FinanceDataSource, PriceRecord, Result};
use dividend_calculator::CalculatorService;
use dividend_common::config::Config;

// ============================================================================
// Mock data source
// ============================================================================

struct MockSource {
    fail: bool,
    info_calls: AtomicU32,
}

impl MockSource {
    fn healthy() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            info_calls: AtomicU32::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            info_calls: AtomicU32::new(0),
        })
    }
}

fn snapshot(symbol: &str) -> Value {
    json!({
        "quoteSummary": {"result": [{
            "quoteType": {"symbol": symbol, "shortName": "Unilever PLC"},
            "assetProfile": {"industry": "Household & Personal Products", "sector": "Consumer Defensive"},
            "price": {"exchange": "LSE", "regularMarketPrice": {"raw": 4000.0}},
            "summaryDetail": {
                "dividendYield": {"raw": 0.037},
                "marketCap": {"raw": 100000000000.0},
                "trailingPE": {"raw": 18.5},
                "currency": "GBp"
            },
            "defaultKeyStatistics": {
                "beta": {"raw": 0.3},
                "trailingEps": {"raw": 2.1},
                "pegRatio": {"raw": 3.0}
            },
            "financialData": {"debtToEquity": {"raw": 160.0}},
            "cashflowStatementHistory": {"cashflowStatements": [{
                "endDate": {"raw": 1703980800, "fmt": "2023-12-31"},
                "netIncome": {"raw": 6000.0},
                "dividendsPaid": {"raw": -4000.0}
            }]},
            "incomeStatementHistory": {"incomeStatementHistory": [{
                "endDate": {"raw": 1703980800, "fmt": "2023-12-31"},
                "totalRevenue": {"raw": 59000.0}
            }]}
        }]}
    })
}

fn dividend(year: i32, amount: f64) -> DividendRecord {
    let date = Utc
        .with_ymd_and_hms(year, 3, 1, 0, 0, 0)
        .single()
        .unwrap()
        .timestamp();
    DividendRecord {
        date,
        amount,
        datetime: dividend_calculator::data::format_timestamp(date),
    }
}

#[async_trait]
impl FinanceDataSource for MockSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_ticker_info(&self, symbol: &str) -> Result<Value> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DataError::Transport {
                status: 500,
                url: format!("https://example.test/{}", symbol),
            });
        }
        Ok(snapshot(symbol))
    }

    async fn get_historic_dividends(&self, _symbol: &str) -> Result<Vec<DividendRecord>> {
        let year = Utc::now().year();
        Ok(vec![
            dividend(year - 3, 1.5),
            dividend(year - 2, 1.6),
            dividend(year - 1, 1.7),
            dividend(year, 0.4),
        ])
    }

    async fn get_historic_prices(&self, _: &str, _: &str) -> Result<Vec<PriceRecord>> {
        Ok(Vec::new())
    }

    async fn search_ticker(&self, _query: &str) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn app(source: Arc<MockSource>, cache_dir: &Path) -> Router {
    let mut config = Config::default();
    config.cache.dir = cache_dir.to_path_buf();
    CalculatorService::with_source(config, source).router()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_ratios_returns_every_key() {
    let dir = tempfile::tempdir().unwrap();
    let source = MockSource::healthy();

    let (status, json) = send(app(source.clone(), dir.path()), get("/api/v1/ticker/ULVR.L/ratios")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "OK");
    let data = json["data"].as_object().unwrap();
    for key in [
        "dividend_yield",
        "current_price",
        "current_dividend_amount",
        "dividend_growth",
        "dividend_ratios_per_year",
        "cadi",
        "beta",
        "pe_ratio",
        "eps_ratio",
        "peg_ratio",
        "market_cap",
        "debt_to_equity",
        "intrinsec_value",
    ] {
        assert!(data.contains_key(key), "missing {}", key);
    }

    assert_eq!(data["current_price"], 40.0);
    assert_eq!(data["debt_to_equity"], 1.6);
    assert_eq!(data["cadi"], 3);
    assert_eq!(data["dividend_ratios_per_year"][0]["year"], 2023);
    // one snapshot fetch serves every ratio
    assert_eq!(source.info_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_upstream_failure_is_error_envelope() {
    let dir = tempfile::tempdir().unwrap();

    let (status, json) = send(app(MockSource::failing(), dir.path()), get("/api/v1/ticker/ULVR.L/ratios")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], "ERROR");
    assert!(!json["error"].as_str().unwrap().is_empty());
    assert!(json.get("data").is_none());
}

#[tokio::test]
async fn test_company_and_dividends() {
    let dir = tempfile::tempdir().unwrap();

    let (status, json) = send(app(MockSource::healthy(), dir.path()), get("/api/v1/ticker/ULVR.L/company")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["company_name"], "Unilever PLC");
    assert_eq!(json["data"]["sector"], "Consumer Defensive");

    let (status, json) = send(app(MockSource::healthy(), dir.path()), get("/api/v1/ticker/ULVR.L/dividends")).await;
    assert_eq!(status, StatusCode::OK);
    let per_year = json["data"].as_object().unwrap();
    assert_eq!(per_year.len(), 3);
    assert!(!per_year.contains_key(&Utc::now().year().to_string()));
}

#[tokio::test]
async fn test_income_statements_carry_titles() {
    let dir = tempfile::tempdir().unwrap();

    let (status, json) = send(
        app(MockSource::healthy(), dir.path()),
        get("/api/v1/ticker/ULVR.L/income-statements"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["total_revenue"], 59000.0);
    assert_eq!(json["data"][0]["ebit"], Value::Null);
    assert_eq!(json["title"][0], json!(["Total revenue", "total_revenue"]));
    assert_eq!(json["title"][1], json!(["Operating expenses", null]));
}

#[tokio::test]
async fn test_absent_statements_are_null() {
    let dir = tempfile::tempdir().unwrap();

    let (status, json) = send(
        app(MockSource::healthy(), dir.path()),
        get("/api/v1/ticker/ULVR.L/balance-sheets"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], Value::Null);
    assert!(json.get("title").is_none());
}

#[tokio::test]
async fn test_valuation_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let (status, json) = send(
        app(MockSource::healthy(), dir.path()),
        get("/api/v1/ticker/ULVR.L/valuation"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["ror"], 0.1);
    assert_eq!(json["data"]["hold_years"], 10);
    assert!(json["data"]["dividend_discount"].is_number());
    assert!(json["data"]["dividend_discount_v2"].is_number());
}

#[tokio::test]
async fn test_screener_query_over_cache() {
    let dir = tempfile::tempdir().unwrap();
    for (symbol, exchange, dy) in [("BP.L", "LSE", 0.045), ("KO", "NYSE", 0.03), ("ULVR.L", "LSE", 0.037)] {
        let doc = json!({"quoteSummary": {"result": [{
            "quoteType": {"symbol": symbol},
            "price": {"exchange": exchange},
            "summaryDetail": {"dividendYield": {"raw": dy}}
        }]}});
        std::fs::write(
            dir.path().join(format!("ticker_{}.json", symbol)),
            serde_json::to_vec(&doc).unwrap(),
        )
        .unwrap();
    }

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/screener/query")
        .header("content-type", "application/json")
        .body(Body::from(
            json!([
                {"field": "price.exchange", "op": "eq", "value": "LSE"},
                {"field": "summaryDetail.dividendYield.raw", "op": "gt", "value": 0.04}
            ])
            .to_string(),
        ))
        .unwrap();

    let (status, json) = send(app(MockSource::healthy(), dir.path()), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], json!(["BP.L"]));
}
