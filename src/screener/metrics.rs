use super::models::{DerivedMetrics, PutContract};
use chrono::{Local, NaiveDate};
use std::fmt;

/// Why a contract never reached the filter chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Expiration on or before the evaluation date
    Expired,
    /// A field needed for the metrics is missing from every source
    Incomplete(&'static str),
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Exclusion::Expired => write!(f, "expired"),
            Exclusion::Incomplete(field) => write!(f, "missing {}", field),
        }
    }
}

/// Today's date in local time
pub fn evaluation_date_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Whole calendar days from the evaluation date to expiration
pub fn days_to_expiration(expiration: NaiveDate, evaluation_date: NaiveDate) -> i64 {
    (expiration - evaluation_date).num_days()
}

/// Premium as a percentage of the underlying price
pub fn daily_yield_pct(last_price: f64, underlying_price: f64) -> f64 {
    last_price * 100.0 / underlying_price
}

/// Premium yield scaled to a 365-day year; `days` must be positive
pub fn annualized_yield_pct(daily_yield_pct: f64, days: i64) -> f64 {
    daily_yield_pct * (365.0 / days as f64)
}

pub fn break_even(strike: f64, last_price: f64) -> f64 {
    strike - last_price
}

/// Distance from the underlying down to break-even, as a percentage of the underlying
pub fn cushion_pct(underlying_price: f64, break_even: f64) -> f64 {
    (underlying_price - break_even) * 100.0 / underlying_price
}

/// Compute all derived metrics for a contract.
///
/// Expired contracts are rejected before any division happens. Values are
/// kept at full precision; rounding belongs to the report layer.
pub fn compute_metrics(
    contract: &PutContract,
    underlying_price: f64,
    evaluation_date: NaiveDate,
) -> Result<DerivedMetrics, Exclusion> {
    let days = days_to_expiration(contract.expiration, evaluation_date);
    if days <= 0 {
        return Err(Exclusion::Expired);
    }

    if !(underlying_price.is_finite() && underlying_price > 0.0) {
        return Err(Exclusion::Incomplete("underlying price"));
    }

    let last_price = contract
        .last_price
        .filter(|p| p.is_finite())
        .ok_or(Exclusion::Incomplete("last price"))?;

    let daily = daily_yield_pct(last_price, underlying_price);
    let be = break_even(contract.strike, last_price);

    Ok(DerivedMetrics {
        days_to_expiration: days,
        daily_yield_pct: daily,
        annualized_yield_pct: annualized_yield_pct(daily, days),
        break_even: be,
        cushion_pct: cushion_pct(underlying_price, be),
    })
}
