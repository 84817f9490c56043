use super::models::CandidateResult;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Top candidates for one ticker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickerGroup {
    pub ticker: String,
    pub candidates: Vec<CandidateResult>,
}

/// Annualized yield descending, then days to expiration ascending, then cushion descending
pub fn compare(a: &CandidateResult, b: &CandidateResult) -> Ordering {
    b.metrics
        .annualized_yield_pct
        .total_cmp(&a.metrics.annualized_yield_pct)
        .then_with(|| a.metrics.days_to_expiration.cmp(&b.metrics.days_to_expiration))
        .then_with(|| b.metrics.cushion_pct.total_cmp(&a.metrics.cushion_pct))
}

/// Stable sort by `compare`; equal keys keep their input order
pub fn rank(mut candidates: Vec<CandidateResult>) -> Vec<CandidateResult> {
    candidates.sort_by(compare);
    candidates
}

/// First `n` entries of an already ranked list
pub fn top(ranked: &[CandidateResult], n: usize) -> Vec<CandidateResult> {
    ranked.iter().take(n).cloned().collect()
}

/// Global top-N across every ticker
pub fn rank_global(candidates: Vec<CandidateResult>, n: usize) -> Vec<CandidateResult> {
    let mut ranked = rank(candidates);
    ranked.truncate(n);
    ranked
}

/// Group by ticker (first-appearance order), then rank and truncate each group
pub fn rank_per_ticker(candidates: Vec<CandidateResult>, n: usize) -> Vec<TickerGroup> {
    let mut groups: Vec<TickerGroup> = Vec::new();

    for candidate in candidates {
        match groups.iter().position(|g| g.ticker == candidate.ticker) {
            Some(i) => groups[i].candidates.push(candidate),
            None => groups.push(TickerGroup {
                ticker: candidate.ticker.clone(),
                candidates: vec![candidate],
            }),
        }
    }

    for group in groups.iter_mut() {
        let ranked = rank(std::mem::take(&mut group.candidates));
        group.candidates = ranked.into_iter().take(n).collect();
    }

    groups
}
