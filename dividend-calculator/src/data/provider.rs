//! Finance data source abstraction.
//!
//! Entity models and HTTP routes only talk to this trait, so they can run
//! against the cached Yahoo client in production and a mock in tests.

use async_trait::async_trait;
use serde_json::Value;

use super::{DividendRecord, PriceRecord, Result};

/// Trait for remote finance data sources.
#[async_trait]
pub trait FinanceDataSource: Send + Sync {
    /// Get the source name (e.g. "yahoo")
    fn name(&self) -> &'static str;

    /// Fetch the full quote-summary document for a symbol.
    ///
    /// Fails if the remote source does not report success.
    async fn get_ticker_info(&self, symbol: &str) -> Result<Value>;

    /// Fetch every dividend event from inception to now.
    ///
    /// A symbol without a dividend history is a `MissingData` error,
    /// not an empty list.
    async fn get_historic_dividends(&self, symbol: &str) -> Result<Vec<DividendRecord>>;

    /// Fetch the full price history at `interval` (e.g. "1mo", "1d").
    async fn get_historic_prices(&self, symbol: &str, interval: &str) -> Result<Vec<PriceRecord>>;

    /// Free-text symbol search. Returns the raw quote entries.
    async fn search_ticker(&self, query: &str) -> Result<Vec<Value>>;
}
