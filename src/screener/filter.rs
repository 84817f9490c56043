use super::config::{Moneyness, ScreenConfig, VolatilityDirection};
use super::models::{DerivedMetrics, PutContract, UnderlyingSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The filter check a contract failed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    Moneyness,
    ExpirationWindow,
    Volume,
    OpenInterest,
    Bid,
    ImpliedVolatility,
    AnnualizedYield,
    Cushion,
}

impl Rejection {
    pub const ALL: [Rejection; 8] = [
        Rejection::Moneyness,
        Rejection::ExpirationWindow,
        Rejection::Volume,
        Rejection::OpenInterest,
        Rejection::Bid,
        Rejection::ImpliedVolatility,
        Rejection::AnnualizedYield,
        Rejection::Cushion,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Rejection::Moneyness => "moneyness",
            Rejection::ExpirationWindow => "dte",
            Rejection::Volume => "volume",
            Rejection::OpenInterest => "oi",
            Rejection::Bid => "bid",
            Rejection::ImpliedVolatility => "iv",
            Rejection::AnnualizedYield => "yield",
            Rejection::Cushion => "cushion",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Run the filter chain in its fixed order, stopping at the first failed check.
pub fn evaluate(
    contract: &PutContract,
    metrics: &DerivedMetrics,
    underlying: &UnderlyingSnapshot,
    config: &ScreenConfig,
) -> Result<(), Rejection> {
    // Rule 1: moneyness relative to the underlying
    let in_money_band = match config.moneyness {
        Moneyness::Otm => contract.strike < underlying.price,
        Moneyness::Itm => contract.strike >= underlying.price,
        Moneyness::Any => true,
    };
    if !in_money_band {
        return Err(Rejection::Moneyness);
    }

    // Rule 2: expiration window
    let dte = metrics.days_to_expiration;
    if dte <= 0 || dte > config.max_days_to_expiration {
        return Err(Rejection::ExpirationWindow);
    }

    // Rule 3-4: liquidity
    if contract.volume.unwrap_or(0) < config.min_volume {
        return Err(Rejection::Volume);
    }
    if contract.open_interest.unwrap_or(0) < config.min_open_interest {
        return Err(Rejection::OpenInterest);
    }

    // Rule 5: bid, only when configured
    if let Some(min_bid) = config.min_bid {
        if contract.bid.unwrap_or(0.0) < min_bid {
            return Err(Rejection::Bid);
        }
    }

    // Rule 6: implied volatility, inclusive bounds
    if !iv_within_bounds(contract.implied_volatility, config) {
        return Err(Rejection::ImpliedVolatility);
    }

    // Rule 7-8: return thresholds
    if metrics.annualized_yield_pct < config.min_annualized_yield {
        return Err(Rejection::AnnualizedYield);
    }
    if let Some(min_cushion) = config.min_cushion {
        if metrics.cushion_pct < min_cushion {
            return Err(Rejection::Cushion);
        }
    }

    Ok(())
}

pub fn passes(
    contract: &PutContract,
    metrics: &DerivedMetrics,
    underlying: &UnderlyingSnapshot,
    config: &ScreenConfig,
) -> bool {
    evaluate(contract, metrics, underlying, config).is_ok()
}

/// Unknown volatility only passes when no bound is configured
fn iv_within_bounds(iv: Option<f64>, config: &ScreenConfig) -> bool {
    let (min, max) = (config.min_implied_volatility, config.max_implied_volatility);
    if min.is_none() && max.is_none() {
        return true;
    }

    let Some(iv) = iv else {
        return false;
    };
    min.is_none_or(|lo| iv >= lo) && max.is_none_or(|hi| iv <= hi)
}

/// Highlighted opportunity: yield at or above the alert threshold and
/// volatility on the configured side of the alert volatility (inclusive).
/// Annotation only; never removes a candidate.
pub fn is_highlighted(contract: &PutContract, metrics: &DerivedMetrics, config: &ScreenConfig) -> bool {
    if metrics.annualized_yield_pct < config.alert.min_annualized_yield {
        return false;
    }

    match contract.implied_volatility {
        Some(iv) => match config.alert.iv_direction {
            VolatilityDirection::Above => iv >= config.alert.iv_threshold,
            VolatilityDirection::Below => iv <= config.alert.iv_threshold,
        },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iv_bounds_min_only_is_unbounded_above() {
        let config = ScreenConfig {
            min_implied_volatility: Some(20.0),
            ..ScreenConfig::default()
        };
        assert!(iv_within_bounds(Some(20.0), &config));
        assert!(iv_within_bounds(Some(400.0), &config));
        assert!(!iv_within_bounds(Some(19.99), &config));
        assert!(!iv_within_bounds(None, &config));
    }

    #[test]
    fn test_iv_bounds_unset_accepts_unknown() {
        assert!(iv_within_bounds(None, &ScreenConfig::default()));
    }

    #[test]
    fn test_rejection_labels_are_unique() {
        let mut labels: Vec<&str> = Rejection::ALL.iter().map(|r| r.label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), Rejection::ALL.len());
    }
}
