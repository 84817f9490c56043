use chrono::{Duration, NaiveDate};
use put_screener::screener::filter::{evaluate, is_highlighted, passes};
use put_screener::screener::{
    compute_metrics, DerivedMetrics, Moneyness, Provenance, PutContract, Rejection, ScreenConfig,
    UnderlyingSnapshot, VolatilityDirection,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 21).unwrap()
    }

    fn underlying(price: f64) -> UnderlyingSnapshot {
        UnderlyingSnapshot {
            ticker: "XYZ".to_string(),
            price,
            week52_low: price * 0.8,
            week52_high: price * 1.2,
        }
    }

    /// Liquid contract with a 30-day expiry and a rich premium
    fn contract(strike: f64, last: f64) -> PutContract {
        let mut c = PutContract::new(strike, Some(last), eval_date() + Duration::days(30), Provenance::Primary);
        c.bid = Some(last - 0.05);
        c.volume = Some(500);
        c.open_interest = Some(1000);
        c.implied_volatility = Some(45.0);
        c
    }

    fn metrics_for(c: &PutContract, price: f64) -> DerivedMetrics {
        compute_metrics(c, price, eval_date()).unwrap()
    }

    #[test]
    fn test_otm_excludes_strike_above_price() {
        let config = ScreenConfig {
            moneyness: Moneyness::Otm,
            min_annualized_yield: 0.0,
            ..ScreenConfig::default()
        };
        let u = underlying(100.0);

        let itm = contract(105.0, 8.0);
        assert_eq!(
            evaluate(&itm, &metrics_for(&itm, 100.0), &u, &config),
            Err(Rejection::Moneyness)
        );

        let otm = contract(95.0, 3.0);
        assert_eq!(evaluate(&otm, &metrics_for(&otm, 100.0), &u, &config), Ok(()));
    }

    #[test]
    fn test_itm_and_any_moneyness() {
        let u = underlying(100.0);
        let at_money = contract(100.0, 4.0);
        let m = metrics_for(&at_money, 100.0);

        let itm = ScreenConfig {
            moneyness: Moneyness::Itm,
            min_annualized_yield: 0.0,
            ..ScreenConfig::default()
        };
        assert!(passes(&at_money, &m, &u, &itm));

        let otm = ScreenConfig {
            moneyness: Moneyness::Otm,
            ..itm.clone()
        };
        assert!(!passes(&at_money, &m, &u, &otm));

        let any = ScreenConfig {
            moneyness: Moneyness::Any,
            ..itm
        };
        assert!(passes(&contract(130.0, 31.0), &metrics_for(&contract(130.0, 31.0), 100.0), &u, &any));
    }

    #[test]
    fn test_filters_apply_in_order() {
        let u = underlying(100.0);
        let mut c = contract(95.0, 0.01);
        c.volume = Some(1);
        let m = metrics_for(&c, 100.0);

        // Volume fails before yield is considered
        let config = ScreenConfig {
            min_volume: 10,
            min_annualized_yield: 40.0,
            ..ScreenConfig::default()
        };
        assert_eq!(evaluate(&c, &m, &u, &config), Err(Rejection::Volume));

        let config = ScreenConfig {
            min_volume: 0,
            ..config
        };
        assert_eq!(evaluate(&c, &m, &u, &config), Err(Rejection::AnnualizedYield));
    }

    #[test]
    fn test_expiration_window() {
        let u = underlying(100.0);
        let c = contract(95.0, 3.0);
        let m = metrics_for(&c, 100.0);

        let config = ScreenConfig {
            max_days_to_expiration: 29,
            min_annualized_yield: 0.0,
            ..ScreenConfig::default()
        };
        assert_eq!(evaluate(&c, &m, &u, &config), Err(Rejection::ExpirationWindow));

        let config = ScreenConfig {
            max_days_to_expiration: 30,
            ..config
        };
        assert!(passes(&c, &m, &u, &config));
    }

    #[test]
    fn test_missing_liquidity_counts_as_zero() {
        let u = underlying(100.0);
        let mut c = contract(95.0, 3.0);
        c.open_interest = None;
        let m = metrics_for(&c, 100.0);

        let config = ScreenConfig {
            min_open_interest: 1,
            min_annualized_yield: 0.0,
            ..ScreenConfig::default()
        };
        assert_eq!(evaluate(&c, &m, &u, &config), Err(Rejection::OpenInterest));
    }

    #[test]
    fn test_optional_thresholds_inactive_when_unset() {
        let u = underlying(100.0);
        let mut c = contract(95.0, 3.0);
        c.bid = None;
        c.implied_volatility = None;
        let m = metrics_for(&c, 100.0);

        let config = ScreenConfig {
            min_annualized_yield: 0.0,
            ..ScreenConfig::default()
        };
        assert!(passes(&c, &m, &u, &config));

        let with_bid = ScreenConfig {
            min_bid: Some(0.10),
            ..config.clone()
        };
        assert_eq!(evaluate(&c, &m, &u, &with_bid), Err(Rejection::Bid));

        let with_cushion = ScreenConfig {
            min_cushion: Some(10.0),
            ..config
        };
        // cushion is (100 - 92) / 100 = 8%
        assert_eq!(evaluate(&c, &m, &u, &with_cushion), Err(Rejection::Cushion));
    }

    #[test]
    fn test_iv_bounds_are_inclusive() {
        let u = underlying(100.0);
        let config = ScreenConfig {
            min_annualized_yield: 0.0,
            min_implied_volatility: Some(30.0),
            max_implied_volatility: Some(45.0),
            ..ScreenConfig::default()
        };

        for (iv, expected) in [(30.0, true), (45.0, true), (29.9, false), (45.1, false)] {
            let mut c = contract(95.0, 3.0);
            c.implied_volatility = Some(iv);
            let m = metrics_for(&c, 100.0);
            assert_eq!(passes(&c, &m, &u, &config), expected, "iv {}", iv);
        }
    }

    #[test]
    fn test_highlight_is_annotation_only() {
        let u = underlying(100.0);
        // 3.0 over 30 days on 100 => 36.5% annualized
        let c = contract(95.0, 3.0);
        let m = metrics_for(&c, 100.0);

        let mut config = ScreenConfig {
            min_annualized_yield: 0.0,
            ..ScreenConfig::default()
        };
        config.alert.min_annualized_yield = 36.0;
        config.alert.iv_threshold = 45.0;

        config.alert.iv_direction = VolatilityDirection::Above;
        assert!(is_highlighted(&c, &m, &config));

        config.alert.iv_direction = VolatilityDirection::Below;
        assert!(is_highlighted(&c, &m, &config));

        config.alert.iv_threshold = 40.0;
        assert!(!is_highlighted(&c, &m, &config));
        assert!(passes(&c, &m, &u, &config));

        config.alert.min_annualized_yield = 50.0;
        config.alert.iv_direction = VolatilityDirection::Above;
        assert!(!is_highlighted(&c, &m, &config));
    }
}
