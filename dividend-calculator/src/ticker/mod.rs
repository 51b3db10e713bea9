//! Entity models over one symbol's snapshot.
//!
//! A [`Ticker`] fetches the quote-summary document from its data source on
//! first use and keeps it for the life of the instance. Dividend history is
//! memoized the same way. Instances are cheap and never shared across
//! requests.
//!
//! Absent fields come back as `None`. Arithmetic that has no defined result
//! for the available data (zero net income, a one-year dividend series) is a
//! [`DataError::Undefined`].

mod dividends;
mod financial;

pub use dividends::{cadi, dividend_growth, dividends_per_year, projected_dividend};
pub use financial::{
    BalanceSheet, CashFlow, Financial, IncomeStatement, StatementTitle, INCOME_STATEMENT_TITLES,
};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::data::{
    safe_get, safe_get_f64, safe_get_i64, safe_get_str, DataError, DividendRecord,
    FinanceDataSource, Result,
};

/// Path from the document root to the per-symbol result.
const SUMMARY_ROOT: [&str; 3] = ["quoteSummary", "result", "0"];

/// Exchange code whose prices are quoted in minor units.
const LONDON_EXCHANGE: &str = "LSE";

/// Years of history behind the headline dividend growth figure.
pub const GROWTH_YEARS: usize = 5;

/// Years of history behind the dividend discount model growth rate.
const DDM_GROWTH_YEARS: usize = 10;

/// Default required rate of return for the dividend discount models.
pub const DEFAULT_ROR: f64 = 0.1;

/// Default holding period (years) for the second dividend discount model.
pub const DEFAULT_HOLD_YEARS: u32 = 10;

/// Longest holding period the API accepts for the second dividend discount model.
pub const MAX_HOLD_YEARS: u32 = 100;

// ============================================================================
// Views
// ============================================================================

/// Dividend ratios for one cash-flow statement year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyRatio {
    pub date: Option<String>,
    pub year: i32,
    pub net_income: f64,
    pub dividends_paid: f64,
    pub payout_ratio: f64,
    pub dividend_cover: f64,
}

/// Headline ratios for a symbol.
#[derive(Debug, Clone, Serialize)]
pub struct Ratios {
    pub dividend_yield: f64,
    pub current_price: Option<f64>,
    pub current_dividend_amount: f64,
    pub dividend_growth: f64,
    pub dividend_ratios_per_year: Vec<YearlyRatio>,
    pub cadi: u32,
    pub beta: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub eps_ratio: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub debt_to_equity: Option<f64>,
    #[serde(rename = "intrinsec_value")]
    pub intrinsic_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyProfile {
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub sector: Option<String>,
}

/// Fair value estimates under the given assumptions.
#[derive(Debug, Clone, Serialize)]
pub struct Valuation {
    pub ror: f64,
    pub hold_years: u32,
    pub dividend_discount: f64,
    pub dividend_discount_v2: f64,
    pub intrinsic_value: Option<f64>,
}

/// Upcoming dividend dates, both as timestamps and as provider-formatted strings.
#[derive(Debug, Clone, Serialize)]
pub struct DividendCalendar {
    pub ex_dividend_date: Option<i64>,
    pub ex_dividend_date_fmt: Option<String>,
    pub dividend_date: Option<i64>,
    pub dividend_date_fmt: Option<String>,
    pub trailing_average_dividend_yield: f64,
    pub currency: Option<String>,
    pub exchange: Option<String>,
}

// ============================================================================
// Ticker
// ============================================================================

/// Lazily fetched, memoized view over one symbol.
pub struct Ticker {
    symbol: String,
    source: Arc<dyn FinanceDataSource>,
    info: OnceCell<Value>,
    dividends: OnceCell<Vec<DividendRecord>>,
}

impl Ticker {
    pub fn new(symbol: impl Into<String>, source: Arc<dyn FinanceDataSource>) -> Self {
        Self {
            symbol: symbol.into(),
            source,
            info: OnceCell::new(),
            dividends: OnceCell::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The quote-summary document, fetched on first call.
    pub async fn info(&self) -> Result<&Value> {
        self.info
            .get_or_try_init(|| self.source.get_ticker_info(&self.symbol))
            .await
    }

    /// Dividend events, fetched on first call.
    pub async fn historic_dividends(&self) -> Result<&[DividendRecord]> {
        self.dividends
            .get_or_try_init(|| self.source.get_historic_dividends(&self.symbol))
            .await
            .map(Vec::as_slice)
    }

    /// Look up `path` below the per-symbol result.
    async fn field(&self, path: &[&str]) -> Result<Option<&Value>> {
        let info = self.info().await?;
        let full: Vec<&str> = SUMMARY_ROOT.iter().chain(path).copied().collect();
        Ok(safe_get(info, &full))
    }

    async fn field_f64(&self, path: &[&str]) -> Result<Option<f64>> {
        Ok(self.field(path).await?.and_then(Value::as_f64))
    }

    async fn field_i64(&self, path: &[&str]) -> Result<Option<i64>> {
        Ok(self.field(path).await?.and_then(Value::as_i64))
    }

    async fn field_string(&self, path: &[&str]) -> Result<Option<String>> {
        Ok(self
            .field(path)
            .await?
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    // ------------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------------

    pub async fn company_name(&self) -> Result<Option<String>> {
        self.field_string(&["quoteType", "shortName"]).await
    }

    pub async fn industry(&self) -> Result<Option<String>> {
        self.field_string(&["assetProfile", "industry"]).await
    }

    pub async fn sector(&self) -> Result<Option<String>> {
        self.field_string(&["assetProfile", "sector"]).await
    }

    pub async fn exchange_name(&self) -> Result<Option<String>> {
        self.field_string(&["price", "exchange"]).await
    }

    pub async fn currency(&self) -> Result<Option<String>> {
        self.field_string(&["summaryDetail", "currency"]).await
    }

    pub async fn company(&self) -> Result<CompanyProfile> {
        Ok(CompanyProfile {
            company_name: self.company_name().await?,
            industry: self.industry().await?,
            sector: self.sector().await?,
        })
    }

    // ------------------------------------------------------------------------
    // Market ratios
    // ------------------------------------------------------------------------

    /// Dividend yield, 0 when the provider reports none.
    pub async fn dividend_yield(&self) -> Result<f64> {
        Ok(self
            .field_f64(&["summaryDetail", "dividendYield", "raw"])
            .await?
            .unwrap_or(0.0))
    }

    pub async fn beta(&self) -> Result<Option<f64>> {
        self.field_f64(&["defaultKeyStatistics", "beta", "raw"]).await
    }

    pub async fn market_cap(&self) -> Result<Option<f64>> {
        self.field_f64(&["summaryDetail", "marketCap", "raw"]).await
    }

    pub async fn pe_ratio(&self) -> Result<Option<f64>> {
        self.field_f64(&["summaryDetail", "trailingPE", "raw"]).await
    }

    pub async fn eps_ratio(&self) -> Result<Option<f64>> {
        self.field_f64(&["defaultKeyStatistics", "trailingEps", "raw"])
            .await
    }

    pub async fn peg_ratio(&self) -> Result<Option<f64>> {
        self.field_f64(&["defaultKeyStatistics", "pegRatio", "raw"])
            .await
    }

    /// Debt to equity as a fraction (the provider reports it scaled by 100).
    pub async fn debt_to_equity(&self) -> Result<Option<f64>> {
        Ok(self
            .field_f64(&["financialData", "debtToEquity", "raw"])
            .await?
            .map(|v| v / 100.0))
    }

    /// Market price in major units. London listings are quoted in pence.
    pub async fn current_price(&self) -> Result<Option<f64>> {
        let price = self
            .field_f64(&["price", "regularMarketPrice", "raw"])
            .await?;
        let london = self.exchange_name().await?.as_deref() == Some(LONDON_EXCHANGE);

        Ok(price.map(|p| if london { p / 100.0 } else { p }))
    }

    /// Five-year average dividend yield as a fraction, 0 when absent.
    pub async fn trailing_average_dividend_yield(&self) -> Result<f64> {
        Ok(self
            .field_f64(&["summaryDetail", "fiveYearAvgDividendYield", "raw"])
            .await?
            .map(|v| v / 100.0)
            .unwrap_or(0.0))
    }

    // ------------------------------------------------------------------------
    // Dividend calendar
    // ------------------------------------------------------------------------

    pub async fn ex_dividend_date(&self) -> Result<Option<i64>> {
        self.field_i64(&["calendarEvents", "exDividendDate", "raw"])
            .await
    }

    pub async fn ex_dividend_date_fmt(&self) -> Result<Option<String>> {
        self.field_string(&["calendarEvents", "exDividendDate", "fmt"])
            .await
    }

    pub async fn next_dividend_date(&self) -> Result<Option<i64>> {
        self.field_i64(&["calendarEvents", "dividendDate", "raw"])
            .await
    }

    pub async fn next_dividend_date_fmt(&self) -> Result<Option<String>> {
        self.field_string(&["calendarEvents", "dividendDate", "fmt"])
            .await
    }

    pub async fn calendar(&self) -> Result<DividendCalendar> {
        Ok(DividendCalendar {
            ex_dividend_date: self.ex_dividend_date().await?,
            ex_dividend_date_fmt: self.ex_dividend_date_fmt().await?,
            dividend_date: self.next_dividend_date().await?,
            dividend_date_fmt: self.next_dividend_date_fmt().await?,
            trailing_average_dividend_yield: self.trailing_average_dividend_yield().await?,
            currency: self.currency().await?,
            exchange: self.exchange_name().await?,
        })
    }

    // ------------------------------------------------------------------------
    // Dividend history
    // ------------------------------------------------------------------------

    /// Payout ratio and dividend cover per cash-flow statement year.
    ///
    /// An absent statement history yields an empty list. A statement with
    /// absent or zero net income or dividends paid is undefined.
    pub async fn yearly_ratios(&self) -> Result<Vec<YearlyRatio>> {
        let statements = match self
            .field(&["cashflowStatementHistory", "cashflowStatements"])
            .await?
        {
            Some(Value::Array(statements)) => statements,
            _ => return Ok(Vec::new()),
        };

        statements.iter().map(yearly_ratio).collect()
    }

    /// Summed dividends per completed calendar year, oldest first.
    pub async fn dividends_per_year(&self) -> Result<BTreeMap<i32, f64>> {
        let records = self.historic_dividends().await?;
        Ok(dividends_per_year(records, Utc::now().year()))
    }

    async fn yearly_totals(&self) -> Result<Vec<f64>> {
        Ok(self.dividends_per_year().await?.into_values().collect())
    }

    /// Average dividend growth over the last `last_years` completed years.
    pub async fn yearly_dividend_growth(&self, last_years: usize) -> Result<f64> {
        dividend_growth(&self.yearly_totals().await?, last_years)
    }

    /// Expected dividend per share for the year in progress.
    pub async fn current_year_div_per_share(&self) -> Result<f64> {
        let totals = self.yearly_totals().await?;
        let growth = dividend_growth(&totals, GROWTH_YEARS)?;
        projected_dividend(&totals, growth)
    }

    /// Consecutive annual dividend increase streak.
    pub async fn cadi(&self) -> Result<u32> {
        Ok(cadi(&self.yearly_totals().await?))
    }

    // ------------------------------------------------------------------------
    // Valuation models
    // ------------------------------------------------------------------------

    async fn current_dividend(&self) -> Result<(f64, f64)> {
        let price = self
            .current_price()
            .await?
            .ok_or_else(|| DataError::MissingData(format!("No market price for {}", self.symbol)))?;
        let dividend = self.dividend_yield().await? * price / 100.0;
        Ok((dividend, price))
    }

    /// Gordon growth estimate: `d / (ror - growth)` with ten years of growth.
    pub async fn dividend_discount_model(&self, ror: f64) -> Result<f64> {
        let (dividend, _) = self.current_dividend().await?;
        let growth = self.yearly_dividend_growth(DDM_GROWTH_YEARS).await?;

        let spread = ror - growth;
        if spread == 0.0 {
            return Err(DataError::Undefined(
                "required rate of return equals dividend growth".into(),
            ));
        }
        Ok(dividend / spread)
    }

    /// Discounted dividends over `hold_years` plus the discounted resale price.
    pub async fn dividend_discount_model_v2(&self, ror: f64, hold_years: u32) -> Result<f64> {
        let years = i32::try_from(hold_years).map_err(|_| {
            DataError::Undefined(format!("holding period of {} years", hold_years))
        })?;
        let (dividend, price) = self.current_dividend().await?;
        Ok(discounted_hold_value(dividend, price, ror, years))
    }

    /// PEG based intrinsic value `eps * (1 + peg / 100) * pe`. `None` without a PEG.
    pub async fn ratios_valuation_model(&self) -> Result<Option<f64>> {
        let Some(peg) = self.peg_ratio().await? else {
            return Ok(None);
        };
        let eps = self.eps_ratio().await?;
        let pe = self.pe_ratio().await?;

        Ok(eps.zip(pe).map(|(eps, pe)| eps * (1.0 + peg / 100.0) * pe))
    }

    pub async fn valuation(&self, ror: f64, hold_years: u32) -> Result<Valuation> {
        Ok(Valuation {
            ror,
            hold_years,
            dividend_discount: self.dividend_discount_model(ror).await?,
            dividend_discount_v2: self.dividend_discount_model_v2(ror, hold_years).await?,
            intrinsic_value: self.ratios_valuation_model().await?,
        })
    }

    /// Every headline ratio. Fails on the first undefined one.
    pub async fn ratios(&self) -> Result<Ratios> {
        Ok(Ratios {
            dividend_yield: self.dividend_yield().await?,
            current_price: self.current_price().await?,
            current_dividend_amount: self.current_year_div_per_share().await?,
            dividend_growth: self.yearly_dividend_growth(GROWTH_YEARS).await?,
            dividend_ratios_per_year: self.yearly_ratios().await?,
            cadi: self.cadi().await?,
            beta: self.beta().await?,
            pe_ratio: self.pe_ratio().await?,
            eps_ratio: self.eps_ratio().await?,
            peg_ratio: self.peg_ratio().await?,
            market_cap: self.market_cap().await?,
            debt_to_equity: self.debt_to_equity().await?,
            intrinsic_value: self.ratios_valuation_model().await?,
        })
    }
}

fn yearly_ratio(statement: &Value) -> Result<YearlyRatio> {
    let end_date = safe_get_i64(statement, &["endDate", "raw"])
        .ok_or_else(|| DataError::MissingData("Cash flow statement has no end date".into()))?;
    let year = DateTime::from_timestamp(end_date, 0)
        .map(|dt| dt.year())
        .ok_or_else(|| DataError::Undefined(format!("end date {} is out of range", end_date)))?;

    let net_income = safe_get_f64(statement, &["netIncome", "raw"]);
    let dividends_paid = safe_get_f64(statement, &["dividendsPaid", "raw"]).map(f64::abs);

    let (net_income, dividends_paid) = match (net_income, dividends_paid) {
        (Some(ni), Some(dp)) if ni != 0.0 && dp != 0.0 => (ni, dp),
        _ => {
            return Err(DataError::Undefined(format!(
                "payout ratio for {} needs non-zero net income and dividends paid",
                year
            )))
        }
    };

    Ok(YearlyRatio {
        date: safe_get_str(statement, &["endDate", "fmt"]).map(str::to_string),
        year,
        net_income,
        dividends_paid,
        payout_ratio: dividends_paid / net_income,
        dividend_cover: net_income / dividends_paid,
    })
}

/// `Σ_{i<hold} (d + d·i / (1+ror)^i) + (p/100 + p/100·ror) / (1+ror)^hold`
fn discounted_hold_value(dividend: f64, price: f64, ror: f64, hold_years: i32) -> f64 {
    let discount = 1.0 + ror;

    let dividends: f64 = (0..hold_years)
        .map(|i| dividend + (dividend * f64::from(i)) / discount.powi(i))
        .sum();

    let selling_price = price / 100.0 + price / 100.0 * ror;
    dividends + selling_price / discount.powi(hold_years)
}
