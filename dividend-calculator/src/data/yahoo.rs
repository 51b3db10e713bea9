//! Yahoo Finance data source.
//!
//! # Endpoints
//! - `/v10/finance/quoteSummary/{symbol}?modules=...` - full ticker snapshot
//! - `/v8/finance/chart/{symbol}?period1=0&period2=now&interval=1mo&events=div` - dividends
//! - `/v8/finance/chart/{symbol}?range=max&interval={interval}` - price history
//! - `/v1/finance/search?q={query}` - symbol search
//!
//! Snapshot, dividend, and price responses are cached on disk under the
//! `ticker`, `dividends`, and `prices` namespaces. Search is never cached.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::debug;

use dividend_common::config::{CacheConfig, Config, ProviderConfig};

use super::accessor::{safe_get, safe_get_f64, safe_get_i64, safe_get_str};
use super::cache::DiskCache;
use super::provider::FinanceDataSource;
use super::{format_timestamp, to_major_units, DataError, DividendRecord, PriceRecord, Result};

// ============================================================================
// Constants
// ============================================================================

const QUOTE_SUMMARY_ENDPOINT: &str = "/v10/finance/quoteSummary";
const CHART_ENDPOINT: &str = "/v8/finance/chart";
const SEARCH_ENDPOINT: &str = "/v1/finance/search";

/// Dividend events are requested at monthly granularity.
const DIVIDEND_INTERVAL: &str = "1mo";

/// Sub-modules requested for every ticker snapshot.
pub const QUOTE_SUMMARY_MODULES: &[&str] = &[
    "assetProfile",
    "balanceSheetHistory",
    "balanceSheetHistoryQuarterly",
    "calendarEvents",
    "cashflowStatementHistory",
    "cashflowStatementHistoryQuarterly",
    "defaultKeyStatistics",
    "earnings",
    "earningsHistory",
    "earningsTrend",
    "financialData",
    "fundOwnership",
    "incomeStatementHistory",
    "incomeStatementHistoryQuarterly",
    "indexTrend",
    "industryTrend",
    "insiderHolders",
    "insiderTransactions",
    "institutionOwnership",
    "majorDirectHolders",
    "majorHoldersBreakdown",
    "netSharePurchaseActivity",
    "price",
    "quoteType",
    "recommendationTrend",
    "secFilings",
    "sectorTrend",
    "summaryDetail",
    "summaryProfile",
    "symbol",
    "upgradeDowngradeHistory",
    "fundProfile",
    "topHoldings",
    "fundPerformance",
];

// ============================================================================
// Yahoo Finance Client
// ============================================================================

/// Cached Yahoo Finance client.
pub struct YahooFinance {
    client: reqwest::Client,
    /// Host for quote-summary and price chart calls
    quote_base_url: String,
    /// Host for dividend chart and search calls
    chart_base_url: String,
    ticker_cache: DiskCache,
    dividends_cache: DiskCache,
    prices_cache: DiskCache,
}

impl YahooFinance {
    /// Create a client from provider and cache settings.
    pub fn new(provider: &ProviderConfig, cache: &CacheConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(provider.user_agent.clone())
            .timeout(std::time::Duration::from_secs(provider.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let ttl = i64::try_from(cache.ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);

        Self {
            client,
            quote_base_url: provider.quote_base_url.trim_end_matches('/').to_string(),
            chart_base_url: provider.chart_base_url.trim_end_matches('/').to_string(),
            ticker_cache: DiskCache::new(&cache.dir, "ticker", ttl),
            dividends_cache: DiskCache::new(&cache.dir, "dividends", ttl),
            prices_cache: DiskCache::new(&cache.dir, "prices", ttl),
        }
    }

    /// Create from the root config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.provider, &config.cache)
    }

    /// GET `url` and parse the body as JSON. Anything but 200 is a transport failure.
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        debug!(url = %url, "Calling Yahoo Finance");

        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(DataError::Transport {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch_ticker_info(&self, symbol: &str) -> Result<Value> {
        let url = format!("{}{}/{}", self.quote_base_url, QUOTE_SUMMARY_ENDPOINT, symbol);
        self.get_json(&url, &[("modules", QUOTE_SUMMARY_MODULES.join(","))])
            .await
    }

    async fn fetch_dividends(&self, symbol: &str) -> Result<Vec<DividendRecord>> {
        let url = format!("{}{}/{}", self.chart_base_url, CHART_ENDPOINT, symbol);
        let body = self
            .get_json(
                &url,
                &[
                    ("period1", "0".to_string()),
                    ("period2", Utc::now().timestamp().to_string()),
                    ("interval", DIVIDEND_INTERVAL.to_string()),
                    ("events", "div".to_string()),
                ],
            )
            .await?;

        parse_dividends(symbol, &body)
    }

    async fn fetch_prices(&self, symbol: &str, interval: &str) -> Result<Vec<PriceRecord>> {
        let url = format!("{}{}/{}", self.quote_base_url, CHART_ENDPOINT, symbol);
        let body = self
            .get_json(
                &url,
                &[
                    ("range", "max".to_string()),
                    ("interval", interval.to_string()),
                ],
            )
            .await?;

        parse_prices(&body)
    }
}

#[async_trait]
impl FinanceDataSource for YahooFinance {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn get_ticker_info(&self, symbol: &str) -> Result<Value> {
        self.ticker_cache
            .get_or_fetch(&[symbol], || self.fetch_ticker_info(symbol))
            .await
    }

    async fn get_historic_dividends(&self, symbol: &str) -> Result<Vec<DividendRecord>> {
        self.dividends_cache
            .get_or_fetch(&[symbol], || self.fetch_dividends(symbol))
            .await
    }

    async fn get_historic_prices(&self, symbol: &str, interval: &str) -> Result<Vec<PriceRecord>> {
        self.prices_cache
            .get_or_fetch(&[symbol, interval], || self.fetch_prices(symbol, interval))
            .await
    }

    async fn search_ticker(&self, query: &str) -> Result<Vec<Value>> {
        let url = format!("{}{}", self.chart_base_url, SEARCH_ENDPOINT);
        let body = self.get_json(&url, &[("q", query.to_string())]).await?;

        match safe_get(&body, &["quotes"]) {
            Some(Value::Array(quotes)) => Ok(quotes.clone()),
            _ => Err(DataError::MissingData("Body of the response is null".into())),
        }
    }
}

// ============================================================================
// Response Parsing
// ============================================================================

/// Convert a dividend chart response into records in major currency units,
/// oldest first.
fn parse_dividends(symbol: &str, body: &Value) -> Result<Vec<DividendRecord>> {
    let events = match safe_get(body, &["chart", "result", "0", "events", "dividends"]) {
        Some(Value::Object(events)) => events,
        _ => {
            return Err(DataError::MissingData(format!(
                "Company {} is not paying dividends",
                symbol
            )))
        }
    };

    let currency = safe_get_str(body, &["chart", "result", "0", "meta", "currency"]);

    let mut records = events
        .values()
        .map(|event| {
            let date = safe_get_i64(event, &["date"]);
            let amount = safe_get_f64(event, &["amount"]);
            match (date, amount) {
                (Some(date), Some(amount)) => Ok(DividendRecord {
                    date,
                    amount: to_major_units(amount, currency),
                    datetime: format_timestamp(date),
                }),
                _ => Err(DataError::MissingData(format!(
                    "Malformed dividend event for {}",
                    symbol
                ))),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    records.sort_by_key(|r| r.date);
    Ok(records)
}

/// Zip the parallel price arrays of a chart response into one record per bucket.
fn parse_prices(body: &Value) -> Result<Vec<PriceRecord>> {
    let result = safe_get(body, &["chart", "result", "0"])
        .ok_or_else(|| DataError::MissingData("Body of the response is null".into()))?;

    let timestamps = match safe_get(result, &["timestamp"]) {
        Some(Value::Array(ts)) => ts,
        _ => {
            return Err(DataError::MissingData(
                "Price history has no timestamps".into(),
            ))
        }
    };

    let quote = |field: &str, index: &str| -> Option<f64> {
        safe_get_f64(result, &["indicators", "quote", "0", field, index])
    };

    timestamps
        .iter()
        .enumerate()
        .map(|(i, ts)| {
            let timestamp = ts.as_i64().ok_or_else(|| {
                DataError::MissingData(format!("Price timestamp {} is not an integer", i))
            })?;
            let index = i.to_string();

            Ok(PriceRecord {
                timestamp,
                date: format_timestamp(timestamp),
                open: quote("open", &index),
                close: quote("close", &index),
                high: quote("high", &index),
                low: quote("low", &index),
                volume: quote("volume", &index),
            })
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
