use chrono::{Duration, NaiveDate};
use put_screener::screener::{compute_metrics, Exclusion, Provenance, PutContract};

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 21).unwrap()
    }

    #[test]
    fn test_short_put_metrics_example() {
        let expiration = eval_date() + Duration::days(30);
        let contract = PutContract::new(90.0, Some(2.0), expiration, Provenance::Primary);

        let metrics = compute_metrics(&contract, 100.0, eval_date()).unwrap();

        assert_eq!(metrics.days_to_expiration, 30);
        assert!((metrics.daily_yield_pct - 2.0).abs() < 1e-9);
        assert!((metrics.annualized_yield_pct - 24.333333).abs() < 1e-4);
        assert!((metrics.break_even - 88.0).abs() < 1e-9);
        assert!((metrics.cushion_pct - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_dte_is_excluded_first() {
        // Missing last price would also exclude; expiry must win
        for offset in [0, -1, -30] {
            let expiration = eval_date() + Duration::days(offset);
            let contract = PutContract::new(90.0, None, expiration, Provenance::Primary);
            assert_eq!(
                compute_metrics(&contract, 0.0, eval_date()),
                Err(Exclusion::Expired),
                "offset {}",
                offset
            );
        }
    }

    #[test]
    fn test_one_day_to_expiration_annualizes_by_365() {
        let expiration = eval_date() + Duration::days(1);
        let contract = PutContract::new(50.0, Some(0.5), expiration, Provenance::Primary);

        let metrics = compute_metrics(&contract, 50.0, eval_date()).unwrap();
        assert!((metrics.daily_yield_pct - 1.0).abs() < 1e-9);
        assert!((metrics.annualized_yield_pct - 365.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_underlying_price_is_incomplete() {
        let expiration = eval_date() + Duration::days(10);
        let contract = PutContract::new(50.0, Some(0.5), expiration, Provenance::Primary);
        assert!(matches!(
            compute_metrics(&contract, 0.0, eval_date()),
            Err(Exclusion::Incomplete(_))
        ));
    }

    #[test]
    fn test_zero_premium_is_a_valid_zero_yield() {
        let expiration = eval_date() + Duration::days(10);
        let contract = PutContract::new(50.0, Some(0.0), expiration, Provenance::Primary);

        let metrics = compute_metrics(&contract, 60.0, eval_date()).unwrap();
        assert_eq!(metrics.annualized_yield_pct, 0.0);
        assert_eq!(metrics.break_even, 50.0);
    }
}
