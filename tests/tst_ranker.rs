use chrono::NaiveDate;
use put_screener::screener::ranker::{rank, rank_global, rank_per_ticker, top};
use put_screener::screener::{CandidateResult, DerivedMetrics, Provenance, PutContract};

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(ticker: &str, strike: f64, annual: f64, dte: i64, cushion: f64) -> CandidateResult {
        let exp = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        CandidateResult {
            ticker: ticker.to_string(),
            contract: PutContract::new(strike, Some(1.0), exp, Provenance::Primary),
            metrics: DerivedMetrics {
                days_to_expiration: dte,
                daily_yield_pct: annual * dte as f64 / 365.0,
                annualized_yield_pct: annual,
                break_even: strike - 1.0,
                cushion_pct: cushion,
            },
            highlighted: false,
        }
    }

    fn labels(list: &[CandidateResult]) -> Vec<(String, f64)> {
        list.iter().map(|c| (c.ticker.clone(), c.contract.strike)).collect()
    }

    #[test]
    fn test_global_top_mixes_tickers() {
        let candidates = vec![
            candidate("AAA", 10.0, 60.0, 30, 5.0),
            candidate("AAA", 11.0, 45.0, 30, 5.0),
            candidate("AAA", 12.0, 41.0, 30, 5.0),
            candidate("BBB", 20.0, 70.0, 30, 5.0),
            candidate("BBB", 21.0, 50.0, 30, 5.0),
        ];

        let top3 = rank_global(candidates, 3);

        assert_eq!(top3.len(), 3);
        assert_eq!(
            labels(&top3),
            vec![
                ("BBB".to_string(), 20.0),
                ("AAA".to_string(), 10.0),
                ("BBB".to_string(), 21.0),
            ]
        );
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let candidates = vec![
            candidate("AAA", 1.0, 50.0, 30, 5.0),
            candidate("BBB", 2.0, 50.0, 30, 5.0),
            candidate("CCC", 3.0, 50.0, 30, 5.0),
            candidate("DDD", 4.0, 90.0, 30, 5.0),
        ];

        let ranked = rank(candidates);
        let strikes: Vec<f64> = ranked.iter().map(|c| c.contract.strike).collect();
        assert_eq!(strikes, vec![4.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_ranking_is_idempotent() {
        let candidates = vec![
            candidate("AAA", 1.0, 50.0, 30, 5.0),
            candidate("AAA", 2.0, 50.0, 20, 5.0),
            candidate("BBB", 3.0, 80.0, 45, 2.0),
            candidate("BBB", 4.0, 50.0, 20, 9.0),
        ];

        let once = rank(candidates.clone());
        let twice = rank(once.clone());
        assert_eq!(once, twice);
        assert_eq!(rank(candidates), once);
    }

    #[test]
    fn test_per_ticker_groups_keep_input_order() {
        let candidates = vec![
            candidate("BBB", 20.0, 40.0, 30, 5.0),
            candidate("AAA", 10.0, 90.0, 30, 5.0),
            candidate("BBB", 21.0, 80.0, 30, 5.0),
            candidate("BBB", 22.0, 60.0, 30, 5.0),
        ];

        let groups = rank_per_ticker(candidates, 2);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].ticker, "BBB");
        assert_eq!(labels(&groups[0].candidates), vec![("BBB".to_string(), 21.0), ("BBB".to_string(), 22.0)]);
        assert_eq!(groups[1].ticker, "AAA");
        assert_eq!(groups[1].candidates.len(), 1);
    }

    #[test]
    fn test_top_of_empty_list() {
        assert!(top(&[], 10).is_empty());
        assert!(rank_per_ticker(vec![], 10).is_empty());
    }
}
