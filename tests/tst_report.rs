use chrono::NaiveDate;
use put_screener::screener::report::{write_candidates, CANDIDATE_COLUMNS};
use put_screener::screener::{
    CandidateResult, CsvReport, DerivedMetrics, Provenance, PutContract, RankingMode, ReportSink, ScreenConfig,
    ScreenReport, TickerGroup,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(ticker: &str, strike: f64, annual: f64) -> CandidateResult {
        let mut contract = PutContract::new(
            strike,
            Some(2.0),
            NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
            Provenance::Fallback,
        );
        contract.implied_volatility = Some(41.5);
        CandidateResult {
            ticker: ticker.to_string(),
            contract,
            metrics: DerivedMetrics {
                days_to_expiration: 30,
                daily_yield_pct: 2.0,
                annualized_yield_pct: annual,
                break_even: strike - 2.0,
                cushion_pct: 12.0,
            },
            highlighted: false,
        }
    }

    fn report(ranking: RankingMode, candidates: Vec<CandidateResult>) -> ScreenReport {
        let per_ticker_top = vec![TickerGroup {
            ticker: "AAA".to_string(),
            candidates: candidates.iter().take(1).cloned().collect(),
        }];
        ScreenReport {
            evaluation_date: NaiveDate::from_ymd_opt(2025, 5, 21).unwrap(),
            config: ScreenConfig {
                ranking,
                ..ScreenConfig::default()
            },
            primary_source: "yahoo".to_string(),
            fallback_source: Some("alpha-vantage".to_string()),
            all_candidates: candidates.clone(),
            global_top: candidates,
            per_ticker_top,
            tickers: vec![],
            issues: vec![],
            elapsed_ms: 12,
        }
    }

    #[test]
    fn test_empty_csv_is_header_only() {
        let mut buffer = Vec::new();
        write_candidates(&mut buffer, &[]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, format!("{}\n", CANDIDATE_COLUMNS.join(",")));
    }

    #[test]
    fn test_csv_row_layout() {
        let mut buffer = Vec::new();
        write_candidates(&mut buffer, &[candidate("AAA", 90.0, 24.3333)]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "AAA,90.00,2.00,,2025-06-20,30,2.00,24.33,88.00,12.00,41.50,,,fallback");
    }

    #[test]
    fn test_top_candidates_follow_ranking_mode() {
        let candidates = vec![candidate("AAA", 90.0, 50.0), candidate("BBB", 80.0, 45.0)];

        assert_eq!(report(RankingMode::Both, candidates.clone()).top_candidates().len(), 2);
        assert_eq!(report(RankingMode::PerTicker, candidates).top_candidates().len(), 1);
    }

    #[tokio::test]
    async fn test_csv_sink_writes_both_files() {
        let dir = std::env::temp_dir().join(format!("put-screener-test-{}", std::process::id()));
        let sink = CsvReport::new(&dir);

        sink.publish(&report(RankingMode::Both, vec![])).await.unwrap();

        let all = std::fs::read_to_string(sink.all_candidates_path()).unwrap();
        let top = std::fs::read_to_string(sink.top_candidates_path()).unwrap();
        assert_eq!(all.lines().count(), 1);
        assert_eq!(top.lines().count(), 1);
        assert!(all.starts_with("ticker,strike,"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
