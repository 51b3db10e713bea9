//! Predicate queries over cached ticker documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::data::{safe_get, safe_get_str};

/// Where the symbol lives in a cached ticker document.
const SYMBOL_PATH: [&str; 5] = ["quoteSummary", "result", "0", "quoteType", "symbol"];

/// Comparison applied by one query step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Gt,
    Lt,
    Eq,
    In,
}

impl Operator {
    /// Check `field` (from the document) against `target` (from the query).
    ///
    /// Numbers compare as f64 and strings lexicographically. Mixed types
    /// never match. `in` tests membership of an array target, or substring
    /// of a string target.
    pub fn matches(self, field: &Value, target: &Value) -> bool {
        match self {
            Self::Gt => compare(field, target) == Some(Ordering::Greater),
            Self::Lt => compare(field, target) == Some(Ordering::Less),
            Self::Eq => values_equal(field, target),
            Self::In => match (field, target) {
                (_, Value::Array(items)) => items.iter().any(|item| values_equal(field, item)),
                (Value::String(needle), Value::String(haystack)) => haystack.contains(needle.as_str()),
                _ => false,
            },
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Eq => "eq",
            Self::In => "in",
        };
        write!(f, "{}", s)
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// One step of a query chain: `field op value`.
///
/// `field` is a dotted path below the per-symbol result, e.g.
/// `summaryDetail.dividendYield.raw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Full document path of the targeted field.
    fn path(&self) -> Vec<&str> {
        SYMBOL_PATH[..3]
            .iter()
            .copied()
            .chain(self.field.split('.'))
            .collect()
    }

    /// The document's symbol if the document passes this step.
    ///
    /// Documents without a symbol, or whose field is absent or null, never pass.
    pub fn select(&self, doc: &Value) -> Option<String> {
        let symbol = safe_get_str(doc, &SYMBOL_PATH)?;
        let field = safe_get(doc, &self.path())?;

        self.op
            .matches(field, &self.value)
            .then(|| symbol.to_string())
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}
