use chrono::NaiveDate;
use put_screener::screener::reconciler::merge;
use put_screener::screener::{Provenance, PutContract};

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    #[test]
    fn test_zero_volume_is_backfilled_and_tagged_both() {
        let mut primary = PutContract::new(50.0, Some(1.25), exp(20), Provenance::Primary);
        primary.volume = Some(0);
        let mut fallback = PutContract::new(50.0, Some(1.30), exp(20), Provenance::Fallback);
        fallback.volume = Some(120);

        let merged = merge(vec![primary], vec![fallback]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].volume, Some(120));
        assert_eq!(merged[0].last_price, Some(1.25));
        assert_eq!(merged[0].provenance, Provenance::Both);
    }

    #[test]
    fn test_missing_primary_takes_fallback_zero() {
        let mut primary = PutContract::new(50.0, None, exp(20), Provenance::Primary);
        primary.volume = None;
        primary.implied_volatility = None;
        let mut fallback = PutContract::new(50.0, Some(0.0), exp(20), Provenance::Fallback);
        fallback.volume = Some(0);
        fallback.implied_volatility = Some(0.0);

        let merged = merge(vec![primary], vec![fallback]);

        assert_eq!(merged[0].last_price, Some(0.0));
        assert_eq!(merged[0].volume, Some(0));
        assert_eq!(merged[0].implied_volatility, Some(0.0));
        assert_eq!(merged[0].provenance, Provenance::Both);
    }

    #[test]
    fn test_merge_is_field_by_field() {
        let mut primary = PutContract::new(50.0, None, exp(20), Provenance::Primary);
        primary.bid = Some(1.10);
        primary.volume = Some(40);
        primary.open_interest = None;
        primary.implied_volatility = Some(0.0);

        let mut fallback = PutContract::new(50.0, Some(1.20), exp(20), Provenance::Fallback);
        fallback.bid = Some(9.99);
        fallback.volume = Some(999);
        fallback.open_interest = Some(310);
        fallback.implied_volatility = Some(41.0);

        let merged = merge(vec![primary], vec![fallback]);
        let c = &merged[0];

        // Present, non-zero primary values win
        assert_eq!(c.bid, Some(1.10));
        assert_eq!(c.volume, Some(40));
        // Missing or zero primary values come from the fallback
        assert_eq!(c.last_price, Some(1.20));
        assert_eq!(c.open_interest, Some(310));
        assert_eq!(c.implied_volatility, Some(41.0));
        assert_eq!(c.provenance, Provenance::Both);
    }

    #[test]
    fn test_complete_primary_stays_primary() {
        let mut primary = PutContract::new(50.0, Some(1.0), exp(20), Provenance::Primary);
        primary.bid = Some(0.9);
        primary.volume = Some(10);
        primary.open_interest = Some(20);
        primary.implied_volatility = Some(30.0);
        let fallback = PutContract::new(50.0, Some(1.1), exp(20), Provenance::Fallback);

        let merged = merge(vec![primary.clone()], vec![fallback]);
        assert_eq!(merged, vec![primary]);
    }

    #[test]
    fn test_unmatched_contracts_keep_their_source() {
        let primary = vec![
            PutContract::new(45.0, Some(0.5), exp(20), Provenance::Primary),
            PutContract::new(50.0, Some(1.0), exp(20), Provenance::Primary),
        ];
        let fallback = vec![
            // same strike, different expiration
            PutContract::new(50.0, Some(1.4), exp(27), Provenance::Fallback),
            PutContract::new(50.0, Some(1.1), exp(20), Provenance::Fallback),
        ];

        let merged = merge(primary, fallback);
        let keys: Vec<(f64, NaiveDate, Provenance)> =
            merged.iter().map(|c| (c.strike, c.expiration, c.provenance)).collect();

        assert_eq!(
            keys,
            vec![
                (45.0, exp(20), Provenance::Primary),
                (50.0, exp(20), Provenance::Primary),
                (50.0, exp(27), Provenance::Fallback),
            ]
        );
    }

    #[test]
    fn test_strike_float_noise_still_matches() {
        let mut primary = PutContract::new(52.5, Some(1.0), exp(20), Provenance::Primary);
        primary.volume = None;
        let mut fallback = PutContract::new(52.500000001, Some(1.0), exp(20), Provenance::Fallback);
        fallback.volume = Some(7);

        let merged = merge(vec![primary], vec![fallback]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].volume, Some(7));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(merge(vec![], vec![]).is_empty());

        let only_fallback = merge(vec![], vec![PutContract::new(50.0, Some(1.0), exp(20), Provenance::Fallback)]);
        assert_eq!(only_fallback.len(), 1);
        assert_eq!(only_fallback[0].provenance, Provenance::Fallback);
    }
}
