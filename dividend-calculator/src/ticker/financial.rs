//! Financial statement views.
//!
//! [`Financial`] extends [`Ticker`] with flattened income statements,
//! balance sheets, and cash-flow statements. Each raw statement period
//! becomes one record; any field missing from the provider is `None`.

use serde::Serialize;
use serde_json::Value;
use std::ops::Deref;
use std::sync::Arc;

use super::Ticker;
use crate::data::{safe_get_f64, safe_get_str, FinanceDataSource, Result};

/// Declare a statement record with one optional amount per provider field.
macro_rules! statement_record {
    ($(#[$meta:meta])* $name:ident { $($field:ident => $source:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize)]
        pub struct $name {
            /// Period end date as formatted by the provider
            pub date: Option<String>,
            $(pub $field: Option<f64>,)*
        }

        impl $name {
            fn from_raw(statement: &Value) -> Self {
                Self {
                    date: safe_get_str(statement, &["endDate", "fmt"]).map(str::to_string),
                    $($field: safe_get_f64(statement, &[$source, "raw"]),)*
                }
            }
        }
    };
}

statement_record! {
    /// One income statement period.
    IncomeStatement {
        total_revenue => "totalRevenue",
        cost_of_revenue => "costOfRevenue",
        gross_profit => "grossProfit",
        research_development => "researchDevelopment",
        selling_general_administrative => "sellingGeneralAdministrative",
        total_operating_expenses => "totalOperatingExpenses",
        operating_income => "operatingIncome",
        total_other_income_expense_net => "totalOtherIncomeExpenseNet",
        ebit => "ebit",
        interest_expense => "interestExpense",
        income_before_tax => "incomeBeforeTax",
        income_tax_expense => "incomeTaxExpense",
        net_income_from_continuing_ops => "netIncomeFromContinuingOps",
        net_income => "netIncome",
        net_income_applicable_to_common_shares => "netIncomeApplicableToCommonShares",
    }
}

statement_record! {
    /// One balance sheet period.
    BalanceSheet {
        cash => "cash",
        short_term_investments => "shortTermInvestments",
        net_receivables => "netReceivables",
        inventory => "inventory",
        other_current_assets => "otherCurrentAssets",
        total_current_assets => "totalCurrentAssets",
        long_term_investments => "longTermInvestments",
        property_plant_equipment => "propertyPlantEquipment",
        other_assets => "otherAssets",
        total_assets => "totalAssets",
        accounts_payable => "accountsPayable",
        short_long_term_debt => "shortLongTermDebt",
        other_current_liab => "otherCurrentLiab",
        long_term_debt => "longTermDebt",
        other_liab => "otherLiab",
        total_current_liabilities => "totalCurrentLiabilities",
        total_liab => "totalLiab",
        common_stock => "commonStock",
        retained_earnings => "retainedEarnings",
        treasury_stock => "treasuryStock",
        other_stockholder_equity => "otherStockholderEquity",
        total_stockholder_equity => "totalStockholderEquity",
        net_tangible_assets => "netTangibleAssets",
    }
}

statement_record! {
    /// One cash-flow statement period.
    CashFlow {
        net_income => "netIncome",
        depreciation => "depreciation",
        change_to_net_income => "changeToNetincome",
        change_to_account_receivables => "changeToAccountReceivables",
        change_to_liabilities => "changeToLiabilities",
        change_to_inventory => "changeToInventory",
        change_to_operating_activities => "changeToOperatingActivities",
        total_cash_from_operating_activities => "totalCashFromOperatingActivities",
        capital_expenditures => "capitalExpenditures",
        investments => "investments",
        other_cashflows_from_investing_activities => "otherCashflowsFromInvestingActivities",
        total_cashflows_from_investing_activities => "totalCashflowsFromInvestingActivities",
        dividends_paid => "dividendsPaid",
        net_borrowings => "netBorrowings",
        other_cashflows_from_financing_activities => "otherCashflowsFromFinancingActivities",
        total_cash_from_financing_activities => "totalCashFromFinancingActivities",
        change_in_cash => "changeInCash",
        repurchase_of_stock => "repurchaseOfStock",
    }
}

/// Display label paired with the record field it shows. Section headings
/// and figures without a machine-readable counterpart have no field.
pub type StatementTitle = (&'static str, Option<&'static str>);

/// Income statement rows in presentation order.
pub const INCOME_STATEMENT_TITLES: &[StatementTitle] = &[
    ("Total revenue", Some("total_revenue")),
    ("Operating expenses", None),
    (
        "Selling general and administrative",
        Some("selling_general_administrative"),
    ),
    ("Total operating expenses", Some("total_operating_expenses")),
    ("Interest expense", Some("interest_expense")),
    ("Income before tax", Some("income_before_tax")),
    ("Income tax expense", Some("income_tax_expense")),
    (
        "Income from continuing operations",
        Some("net_income_from_continuing_ops"),
    ),
    ("Net income", Some("net_income")),
    (
        "Net income available to common shareholders",
        Some("net_income_applicable_to_common_shares"),
    ),
    ("Basic EPS", None),
    ("Diluted EPS", None),
    ("Basic average shares", None),
    ("Diluted average shares", None),
];

/// Ticker with statement shaping.
pub struct Financial {
    ticker: Ticker,
}

impl Financial {
    pub fn new(symbol: impl Into<String>, source: Arc<dyn FinanceDataSource>) -> Self {
        Self {
            ticker: Ticker::new(symbol, source),
        }
    }

    pub fn income_statement_titles(&self) -> &'static [StatementTitle] {
        INCOME_STATEMENT_TITLES
    }

    /// Income statements, most recent period first. `None` when the section is absent.
    pub async fn income_statements(&self) -> Result<Option<Vec<IncomeStatement>>> {
        self.statements(
            &["incomeStatementHistory", "incomeStatementHistory"],
            IncomeStatement::from_raw,
        )
        .await
    }

    pub async fn balance_sheets(&self) -> Result<Option<Vec<BalanceSheet>>> {
        self.statements(
            &["balanceSheetHistory", "balanceSheetStatements"],
            BalanceSheet::from_raw,
        )
        .await
    }

    pub async fn cash_flows(&self) -> Result<Option<Vec<CashFlow>>> {
        self.statements(
            &["cashflowStatementHistory", "cashflowStatements"],
            CashFlow::from_raw,
        )
        .await
    }

    async fn statements<T>(
        &self,
        path: &[&str],
        shape: fn(&Value) -> T,
    ) -> Result<Option<Vec<T>>> {
        Ok(match self.ticker.field(path).await? {
            Some(Value::Array(periods)) => Some(periods.iter().map(shape).collect()),
            _ => None,
        })
    }
}

impl Deref for Financial {
    type Target = Ticker;

    fn deref(&self) -> &Ticker {
        &self.ticker
    }
}
