use super::alpha_vantage_client::AlphaVantageClient;
use super::config::ScreenConfig;
use super::error::ScreenerError;
use super::filter::{self, Rejection};
use super::metrics::{self, Exclusion};
use super::models::{CandidateResult, PutContract, UnderlyingSnapshot};
use super::quote_source::QuoteSource;
use super::ranker::{self, TickerGroup};
use super::reconciler;
use super::yahoo_client::YahooClient;
use crate::utility::Timer;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, trace, warn};

// -----------------------------------------------
// REPORT TYPES
// -----------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// The ticker contributed nothing
    Error,
    /// One source failed; the ticker continued on what remained
    Degraded,
}

/// A non-fatal problem recorded for one ticker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickerIssue {
    pub ticker: String,
    pub severity: IssueSeverity,
    pub message: String,
}

impl TickerIssue {
    fn error(ticker: &str, message: impl Into<String>) -> Self {
        Self {
            ticker: ticker.to_string(),
            severity: IssueSeverity::Error,
            message: message.into(),
        }
    }

    fn degraded(ticker: &str, message: impl Into<String>) -> Self {
        Self {
            ticker: ticker.to_string(),
            severity: IssueSeverity::Degraded,
            message: message.into(),
        }
    }
}

/// Per-ticker counters for the run summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TickerSummary {
    pub ticker: String,
    pub underlying: Option<UnderlyingSnapshot>,
    pub contracts_seen: usize,
    pub expired: usize,
    pub incomplete: usize,
    pub rejections: BTreeMap<Rejection, usize>,
    pub candidates: usize,
    pub highlighted: usize,
    pub elapsed_ms: u64,
}

impl TickerSummary {
    fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            ..Default::default()
        }
    }

    pub fn rejected(&self) -> usize {
        self.rejections.values().sum()
    }
}

/// Everything one run produced, handed to the report sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenReport {
    pub evaluation_date: NaiveDate,
    pub config: ScreenConfig,
    pub primary_source: String,
    pub fallback_source: Option<String>,
    /// Every passing candidate, ranked
    pub all_candidates: Vec<CandidateResult>,
    /// Empty unless the ranking mode includes the global list
    pub global_top: Vec<CandidateResult>,
    /// Empty unless the ranking mode includes per-ticker lists
    pub per_ticker_top: Vec<TickerGroup>,
    pub tickers: Vec<TickerSummary>,
    pub issues: Vec<TickerIssue>,
    pub elapsed_ms: u64,
}

impl ScreenReport {
    pub fn highlighted(&self) -> impl Iterator<Item = &CandidateResult> {
        self.all_candidates.iter().filter(|c| c.highlighted)
    }

    /// The list the top-N outputs are built from: the global top when it
    /// exists, otherwise the per-ticker lists concatenated.
    pub fn top_candidates(&self) -> Vec<CandidateResult> {
        if self.config.ranking.includes_global() {
            return self.global_top.clone();
        }
        self.per_ticker_top
            .iter()
            .flat_map(|group| group.candidates.iter().cloned())
            .collect()
    }

    pub fn failed_tickers(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Error)
            .count()
    }
}

/// What a ticker contributes to the run
#[derive(Debug)]
struct TickerOutcome {
    summary: TickerSummary,
    candidates: Vec<CandidateResult>,
    issues: Vec<TickerIssue>,
}

impl TickerOutcome {
    fn new(ticker: &str) -> Self {
        Self {
            summary: TickerSummary::new(ticker),
            candidates: Vec::new(),
            issues: Vec::new(),
        }
    }
}

/// Results of asking one source about one ticker
struct SourceFetch {
    name: &'static str,
    underlying: Result<UnderlyingSnapshot, ScreenerError>,
    puts: Result<Vec<PutContract>, ScreenerError>,
    warnings: Vec<String>,
}

// -----------------------------------------------
// SCREENER
// -----------------------------------------------

/// Drives one screening run over every configured ticker.
pub struct Screener {
    primary: Arc<dyn QuoteSource>,
    fallback: Option<Arc<dyn QuoteSource>>,
    config: Arc<ScreenConfig>,
    evaluation_date: NaiveDate,
}

impl Screener {
    pub fn new(
        primary: Arc<dyn QuoteSource>,
        fallback: Option<Arc<dyn QuoteSource>>,
        config: ScreenConfig,
        evaluation_date: NaiveDate,
    ) -> Self {
        Self {
            primary,
            fallback,
            config: Arc::new(config),
            evaluation_date,
        }
    }

    /// Yahoo as primary; Alpha Vantage as fallback when a key is available.
    pub fn with_default_sources(
        config: ScreenConfig,
        evaluation_date: NaiveDate,
        alpha_vantage_key: Option<String>,
    ) -> anyhow::Result<Self> {
        let primary: Arc<dyn QuoteSource> =
            Arc::new(YahooClient::new(evaluation_date, config.max_days_to_expiration)?);

        let fallback: Option<Arc<dyn QuoteSource>> = match alpha_vantage_key {
            Some(key) => Some(Arc::new(AlphaVantageClient::new(key)?)),
            None => {
                warn!("No Alpha Vantage key configured, running without a fallback source");
                None
            }
        };

        Ok(Self::new(primary, fallback, config, evaluation_date))
    }

    /// Screen every configured ticker and rank the survivors.
    ///
    /// Fails only on invalid configuration. Tickers run under a
    /// `max_concurrent` permit pool; results are collected in ticker order.
    pub async fn run(self: Arc<Self>) -> Result<ScreenReport, ScreenerError> {
        self.config.validate()?;

        let timer = Timer::start("screening run");
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut handles = vec![];

        info!(
            tickers = self.config.tickers.len(),
            max_concurrent = self.config.max_concurrent,
            evaluation_date = %self.evaluation_date,
            "Starting screening run"
        );

        for ticker in self.config.tickers.clone() {
            let screener = Arc::clone(&self);
            let sem = Arc::clone(&semaphore);

            let handle = tokio::spawn(async move {
                // The semaphore is never closed
                let _permit = sem.acquire_owned().await.ok();
                screener.screen_ticker(&ticker).await
            });

            handles.push(handle);
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (ticker, handle) in self.config.tickers.iter().zip(handles) {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(ticker = %ticker, error = %e, "Ticker task failed");
                    let mut outcome = TickerOutcome::new(ticker);
                    outcome.issues.push(TickerIssue::error(ticker, format!("task error: {}", e)));
                    outcomes.push(outcome);
                }
            }
        }

        let report = self.assemble(outcomes, timer.elapsed_ms());
        timer.stop();

        info!(
            candidates = report.all_candidates.len(),
            highlighted = report.highlighted().count(),
            issues = report.issues.len(),
            elapsed_ms = report.elapsed_ms,
            "Screening run finished"
        );

        Ok(report)
    }

    fn assemble(&self, outcomes: Vec<TickerOutcome>, elapsed_ms: u64) -> ScreenReport {
        let mut candidates = Vec::new();
        let mut tickers = Vec::with_capacity(outcomes.len());
        let mut issues = Vec::new();

        for outcome in outcomes {
            candidates.extend(outcome.candidates);
            tickers.push(outcome.summary);
            issues.extend(outcome.issues);
        }

        let n = self.config.top_n;
        let per_ticker_top = if self.config.ranking.includes_per_ticker() {
            ranker::rank_per_ticker(candidates.clone(), n)
        } else {
            Vec::new()
        };

        let all_candidates = ranker::rank(candidates);
        let global_top = if self.config.ranking.includes_global() {
            ranker::top(&all_candidates, n)
        } else {
            Vec::new()
        };

        ScreenReport {
            evaluation_date: self.evaluation_date,
            config: self.config.as_ref().clone(),
            primary_source: self.primary.name().to_string(),
            fallback_source: self.fallback.as_ref().map(|f| f.name().to_string()),
            all_candidates,
            global_top,
            per_ticker_top,
            tickers,
            issues,
            elapsed_ms,
        }
    }

    // -----------------------------------------------
    // PER-TICKER PIPELINE
    // -----------------------------------------------

    async fn fetch_from(source: &dyn QuoteSource, ticker: &str) -> SourceFetch {
        let quotes = source.fetch_quotes(ticker).await;
        SourceFetch {
            name: source.name(),
            underlying: quotes.underlying,
            puts: quotes.puts,
            warnings: quotes.warnings,
        }
    }

    async fn screen_ticker(&self, ticker: &str) -> TickerOutcome {
        let timer = Timer::start(format!("screen {}", ticker));
        let mut outcome = TickerOutcome::new(ticker);

        // Both sources are queried together; reconciliation waits for both
        let (primary, fallback) = tokio::join!(Self::fetch_from(self.primary.as_ref(), ticker), async {
            match &self.fallback {
                Some(source) => Some(Self::fetch_from(source.as_ref(), ticker).await),
                None => None,
            }
        });

        let Some(underlying) = resolve_underlying(ticker, &primary, fallback.as_ref(), &mut outcome.issues) else {
            outcome.summary.elapsed_ms = timer.stop().as_millis() as u64;
            return outcome;
        };

        let primary_puts = take_chain(ticker, primary, &mut outcome.issues);
        let fallback_puts = fallback
            .map(|fetch| take_chain(ticker, fetch, &mut outcome.issues))
            .unwrap_or_default();

        let chain = reconciler::merge(primary_puts, fallback_puts);
        if chain.is_empty() {
            outcome
                .issues
                .push(TickerIssue::error(ticker, "no put contracts from any source"));
        }

        outcome.summary.underlying = Some(underlying.clone());
        self.screen_chain(ticker, &underlying, chain, &mut outcome);
        outcome.summary.elapsed_ms = timer.stop().as_millis() as u64;

        info!(
            ticker = %ticker,
            price = underlying.price,
            contracts = outcome.summary.contracts_seen,
            candidates = outcome.summary.candidates,
            "Ticker screened"
        );

        outcome
    }

    /// Metrics, filter and highlight for every contract of one ticker
    fn screen_chain(
        &self,
        ticker: &str,
        underlying: &UnderlyingSnapshot,
        chain: Vec<PutContract>,
        outcome: &mut TickerOutcome,
    ) {
        let summary = &mut outcome.summary;

        for contract in chain {
            summary.contracts_seen += 1;

            let metrics = match metrics::compute_metrics(&contract, underlying.price, self.evaluation_date) {
                Ok(m) => m,
                Err(exclusion) => {
                    trace!(ticker = %ticker, strike = contract.strike, expiration = %contract.expiration, reason = %exclusion, "Contract excluded");
                    match exclusion {
                        Exclusion::Expired => summary.expired += 1,
                        Exclusion::Incomplete(_) => summary.incomplete += 1,
                    }
                    continue;
                }
            };

            if let Err(rejection) = filter::evaluate(&contract, &metrics, underlying, &self.config) {
                *summary.rejections.entry(rejection).or_insert(0) += 1;
                continue;
            }

            let highlighted = filter::is_highlighted(&contract, &metrics, &self.config);
            if highlighted {
                summary.highlighted += 1;
            }
            summary.candidates += 1;

            outcome.candidates.push(CandidateResult {
                ticker: ticker.to_string(),
                contract,
                metrics,
                highlighted,
            });
        }

        debug!(
            ticker = %ticker,
            expired = summary.expired,
            incomplete = summary.incomplete,
            rejected = summary.rejected(),
            "Filter summary"
        );
    }
}

/// Primary snapshot, else fallback; `None` records a ticker error.
fn resolve_underlying(
    ticker: &str,
    primary: &SourceFetch,
    fallback: Option<&SourceFetch>,
    issues: &mut Vec<TickerIssue>,
) -> Option<UnderlyingSnapshot> {
    let primary_err = match &primary.underlying {
        Ok(snapshot) => return Some(snapshot.clone()),
        Err(e) => e,
    };

    match fallback {
        Some(SourceFetch {
            name,
            underlying: Ok(snapshot),
            ..
        }) => {
            warn!(ticker = %ticker, source = primary.name, error = %primary_err, "Underlying from fallback source");
            issues.push(TickerIssue::degraded(
                ticker,
                format!("underlying from {} ({})", name, primary_err),
            ));
            Some(snapshot.clone())
        }
        Some(SourceFetch {
            underlying: Err(fallback_err),
            ..
        }) => {
            error!(ticker = %ticker, primary = %primary_err, fallback = %fallback_err, "No underlying snapshot");
            issues.push(TickerIssue::error(
                ticker,
                format!("no underlying snapshot: {}; {}", primary_err, fallback_err),
            ));
            None
        }
        None => {
            error!(ticker = %ticker, error = %primary_err, "No underlying snapshot");
            issues.push(TickerIssue::error(
                ticker,
                format!("no underlying snapshot: {}", primary_err),
            ));
            None
        }
    }
}

/// A failed chain degrades to an empty one; partial-chain warnings become degraded issues
fn take_chain(ticker: &str, fetch: SourceFetch, issues: &mut Vec<TickerIssue>) -> Vec<PutContract> {
    for warning in fetch.warnings {
        warn!(ticker = %ticker, source = fetch.name, warning = %warning, "Partial put chain");
        issues.push(TickerIssue::degraded(ticker, warning));
    }

    match fetch.puts {
        Ok(puts) => puts,
        Err(e) => {
            warn!(ticker = %ticker, source = fetch.name, error = %e, "Put chain unavailable");
            issues.push(TickerIssue::degraded(ticker, format!("put chain: {}", e)));
            Vec::new()
        }
    }
}
