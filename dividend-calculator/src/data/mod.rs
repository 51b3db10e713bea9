//! Market data module.
//!
//! Fetches quote summaries, dividend events, and price history from the
//! remote finance provider, with every response kept in a time-to-live
//! disk cache.
//!
//! # Components
//! - **accessor**: null-tolerant lookups into loosely-typed JSON documents
//! - **cache**: `<dir>/<namespace>_<args>.json` files reused until their ttl lapses
//! - **provider**: the `FinanceDataSource` trait used by entity models and routes
//! - **yahoo**: the production data source

pub mod accessor;
mod cache;
mod provider;
mod yahoo;

pub use accessor::{safe_get, safe_get_f64, safe_get_i64, safe_get_str};
pub use cache::DiskCache;
pub use provider::FinanceDataSource;
pub use yahoo::{YahooFinance, QUOTE_SUMMARY_MODULES};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while fetching or deriving market data.
#[derive(Debug, Error)]
pub enum DataError {
    /// Remote source answered with a non-success status
    #[error("Status code is {status} ({url})")]
    Transport { status: u16, url: String },

    /// Request could not be sent or the body could not be read
    #[error("Network error: {0}")]
    Network(String),

    /// A section the operation cannot proceed without is absent
    #[error("{0}")]
    MissingData(String),

    /// Arithmetic that is undefined for the available data
    #[error("Undefined result: {0}")]
    Undefined(String),

    /// Cache file could not be read or written
    #[error("Cache IO error: {0}")]
    Cache(#[from] std::io::Error),

    /// Cache file or response body is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for DataError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Network("Request timeout".into())
        } else if e.is_connect() {
            Self::Network("Connection failed".into())
        } else {
            Self::Network(e.to_string())
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// A single historical dividend event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendRecord {
    /// Payment timestamp (unix seconds)
    pub date: i64,
    /// Amount in major currency units
    pub amount: f64,
    /// `date` formatted as `%d-%m-%Y`
    pub datetime: String,
}

/// One price bucket of a historical price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Bucket open timestamp (unix seconds)
    pub timestamp: i64,
    /// `timestamp` formatted as `%d-%m-%Y`
    pub date: String,
    pub open: Option<f64>,
    pub close: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub volume: Option<f64>,
}

/// Format a unix timestamp as `%d-%m-%Y` (UTC).
pub fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%d-%m-%Y").to_string())
        .unwrap_or_default()
}

/// Convert a minor-unit amount (e.g. pence, currency flag `GBp`) into major units.
pub fn to_major_units(amount: f64, currency: Option<&str>) -> f64 {
    match currency {
        Some("GBp") => amount / 100.0,
        _ => amount,
    }
}
