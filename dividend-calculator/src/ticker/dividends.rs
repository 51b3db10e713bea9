//! Yearly dividend series arithmetic.
//!
//! Pure functions over dividend records and yearly totals. The entity model
//! feeds them from the data source; tests feed them directly.

use chrono::{DateTime, Datelike};
use std::collections::BTreeMap;

use crate::data::{DataError, DividendRecord, Result};

/// Sum dividend amounts per UTC calendar year, skipping `current_year`.
pub fn dividends_per_year(records: &[DividendRecord], current_year: i32) -> BTreeMap<i32, f64> {
    let mut totals = BTreeMap::new();

    for record in records {
        let Some(year) = DateTime::from_timestamp(record.date, 0).map(|dt| dt.year()) else {
            continue;
        };
        if year == current_year {
            continue;
        }
        *totals.entry(year).or_insert(0.0) += record.amount;
    }

    totals
}

/// Average year-over-year change of the last `last_years` totals (oldest first).
///
/// Each step contributes `|prior - current| / current`. The mean over the
/// steps is rounded to 4 decimal places.
pub fn dividend_growth(totals: &[f64], last_years: usize) -> Result<f64> {
    let window = &totals[totals.len().saturating_sub(last_years)..];

    if window.len() < 2 {
        return Err(DataError::Undefined(format!(
            "dividend growth needs at least 2 years of dividends, got {}",
            window.len()
        )));
    }

    let mut total_growth = 0.0;
    for pair in window.windows(2) {
        let (prior, current) = (pair[0], pair[1]);
        if current == 0.0 {
            return Err(DataError::Undefined(
                "dividend growth over a year with no dividends".into(),
            ));
        }
        total_growth += (prior - current).abs() / current;
    }

    let steps = (window.len() - 1) as f64;
    Ok(round_to(total_growth / steps, 4))
}

/// Consecutive annual dividend increase streak.
///
/// Walks totals from the most recent year backward and counts years while
/// each is at least the next older one. The year that breaks the streak is
/// still counted.
pub fn cadi(totals: &[f64]) -> u32 {
    let recent_first: Vec<f64> = totals.iter().rev().copied().collect();
    let mut streak = 0;

    for (i, current) in recent_first.iter().enumerate() {
        streak += 1;
        match recent_first.get(i + 1) {
            Some(older) if current < older => break,
            Some(_) => {}
            None => break,
        }
    }

    streak
}

/// Last completed year's total grown by `growth`.
pub fn projected_dividend(totals: &[f64], growth: f64) -> Result<f64> {
    let last = totals
        .last()
        .copied()
        .ok_or_else(|| DataError::MissingData("No completed dividend years".into()))?;
    Ok(last + last * growth)
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
