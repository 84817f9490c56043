use super::config;
use super::error::ScreenerError;
use super::models::CandidateResult;
use super::orchestrator::{IssueSeverity, ScreenReport};

use async_trait::async_trait;
use colored::Colorize;
use csv::Writer;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// A destination for a finished run.
#[async_trait]
pub trait ReportSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn publish(&self, report: &ScreenReport) -> Result<(), ScreenerError>;
}

// -----------------------------------------------
// CSV OUTPUT
// -----------------------------------------------

pub const CANDIDATE_COLUMNS: [&str; 14] = [
    "ticker",
    "strike",
    "last_price",
    "bid",
    "expiration",
    "days_to_expiration",
    "daily_yield_pct",
    "annualized_yield_pct",
    "break_even",
    "cushion_pct",
    "implied_volatility_pct",
    "volume",
    "open_interest",
    "provenance",
];

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

fn optional_money(value: Option<f64>) -> String {
    value.map(money).unwrap_or_default()
}

fn optional_count(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One CSV row, in `CANDIDATE_COLUMNS` order. Missing values are left blank.
pub fn candidate_record(candidate: &CandidateResult) -> [String; 14] {
    let contract = &candidate.contract;
    let metrics = &candidate.metrics;
    [
        candidate.ticker.clone(),
        money(contract.strike),
        optional_money(contract.last_price),
        optional_money(contract.bid),
        contract.expiration.format("%Y-%m-%d").to_string(),
        metrics.days_to_expiration.to_string(),
        money(metrics.daily_yield_pct),
        money(metrics.annualized_yield_pct),
        money(metrics.break_even),
        money(metrics.cushion_pct),
        optional_money(contract.implied_volatility),
        optional_count(contract.volume),
        optional_count(contract.open_interest),
        contract.provenance.to_string(),
    ]
}

/// Write a header and one row per candidate. An empty slice still gets the header.
pub fn write_candidates<W: io::Write>(writer: W, candidates: &[CandidateResult]) -> Result<(), ScreenerError> {
    let mut writer = Writer::from_writer(writer);
    writer.write_record(CANDIDATE_COLUMNS)?;
    for candidate in candidates {
        writer.write_record(candidate_record(candidate))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_candidates_file(path: &Path, candidates: &[CandidateResult]) -> Result<(), ScreenerError> {
    let file = File::create(path)?;
    write_candidates(file, candidates)
}

/// Writes the all-candidates and top-candidates CSV files.
pub struct CsvReport {
    output_dir: PathBuf,
}

impl CsvReport {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn all_candidates_path(&self) -> PathBuf {
        self.output_dir.join(config::ALL_CANDIDATES_CSV)
    }

    pub fn top_candidates_path(&self) -> PathBuf {
        self.output_dir.join(config::TOP_CANDIDATES_CSV)
    }
}

#[async_trait]
impl ReportSink for CsvReport {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn publish(&self, report: &ScreenReport) -> Result<(), ScreenerError> {
        std::fs::create_dir_all(&self.output_dir)?;

        let all_path = self.all_candidates_path();
        write_candidates_file(&all_path, &report.all_candidates)?;

        let top = report.top_candidates();
        let top_path = self.top_candidates_path();
        write_candidates_file(&top_path, &top)?;

        info!(
            all = %all_path.display(),
            top = %top_path.display(),
            rows = report.all_candidates.len(),
            top_rows = top.len(),
            "CSV reports written"
        );
        Ok(())
    }
}

// -----------------------------------------------
// CONSOLE SUMMARY
// -----------------------------------------------

/// Human-readable run summary on stdout.
pub struct ConsoleReport;

impl ConsoleReport {
    fn print_config(report: &ScreenReport) {
        let cfg = &report.config;
        println!("{}", "Configuration".cyan().bold());
        println!("  • Evaluation date: {}", report.evaluation_date);
        println!("  • Tickers: {}", cfg.tickers.join(", "));
        println!(
            "  • Sources: {}{}",
            report.primary_source,
            report
                .fallback_source
                .as_ref()
                .map(|f| format!(" + {}", f))
                .unwrap_or_default()
        );
        println!("  • Moneyness: {}", cfg.moneyness);
        println!("  • Max DTE: {}", cfg.max_days_to_expiration);
        println!("  • Min annualized yield: {:.2}%", cfg.min_annualized_yield);
        if let Some(cushion) = cfg.min_cushion {
            println!("  • Min cushion: {:.2}%", cushion);
        }
        println!("  • Min volume / OI: {} / {}", cfg.min_volume, cfg.min_open_interest);
        if let Some(bid) = cfg.min_bid {
            println!("  • Min bid: {:.2}", bid);
        }
        if cfg.min_implied_volatility.is_some() || cfg.max_implied_volatility.is_some() {
            println!(
                "  • IV range: {} - {}",
                optional_money(cfg.min_implied_volatility),
                optional_money(cfg.max_implied_volatility)
            );
        }
        println!("  • Top N: {} ({})", cfg.top_n, cfg.ranking);
        println!(
            "  • Alert: yield ≥ {:.2}% and IV {} {:.2}%",
            cfg.alert.min_annualized_yield, cfg.alert.iv_direction, cfg.alert.iv_threshold
        );
        println!();
    }

    fn print_tickers(report: &ScreenReport) {
        println!("{}", "Tickers".cyan().bold());
        for summary in &report.tickers {
            match &summary.underlying {
                Some(u) => println!(
                    "  {} {} ${:.2} (52w {:.2} - {:.2}) → {} contracts, {} candidates, {} highlighted [{}ms]",
                    "✓".green(),
                    summary.ticker.yellow(),
                    u.price,
                    u.week52_low,
                    u.week52_high,
                    summary.contracts_seen,
                    summary.candidates,
                    summary.highlighted,
                    summary.elapsed_ms
                ),
                None => println!("  {} {} → no data", "✗".red(), summary.ticker.yellow()),
            }

            if !summary.rejections.is_empty() {
                let parts: Vec<String> = summary
                    .rejections
                    .iter()
                    .map(|(rejection, count)| format!("{}={}", rejection, count))
                    .collect();
                println!(
                    "      rejected: {} | expired={} incomplete={}",
                    parts.join(" "),
                    summary.expired,
                    summary.incomplete
                );
            }
        }
        println!();
    }

    fn print_table(title: &str, candidates: &[CandidateResult]) {
        println!("{}", title.cyan().bold());
        if candidates.is_empty() {
            println!("  (none)");
            println!();
            return;
        }

        println!(
            "  {:<6} {:>9} {:>8} {:>11} {:>4} {:>9} {:>9} {:>8} {:>7}",
            "Ticker", "Strike", "Last", "Expiration", "DTE", "Annual%", "Cushion%", "IV%", "Source"
        );
        for c in candidates {
            let line = format!(
                "  {:<6} {:>9.2} {:>8} {:>11} {:>4} {:>9.2} {:>9.2} {:>8} {:>7}",
                c.ticker,
                c.contract.strike,
                optional_money(c.contract.last_price),
                c.contract.expiration,
                c.metrics.days_to_expiration,
                c.metrics.annualized_yield_pct,
                c.metrics.cushion_pct,
                optional_money(c.contract.implied_volatility),
                c.contract.provenance
            );
            if c.highlighted {
                println!("{} {}", line.green().bold(), "★".yellow());
            } else {
                println!("{}", line);
            }
        }
        println!();
    }

    fn print_issues(report: &ScreenReport) {
        if report.issues.is_empty() {
            return;
        }

        println!("{}", "Issues".red().bold());
        for issue in &report.issues {
            let marker = match issue.severity {
                IssueSeverity::Error => "✗".red(),
                IssueSeverity::Degraded => "⚠".yellow(),
            };
            println!("  {} {} → {}", marker, issue.ticker.yellow(), issue.message);
        }
        println!();
    }
}

#[async_trait]
impl ReportSink for ConsoleReport {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn publish(&self, report: &ScreenReport) -> Result<(), ScreenerError> {
        println!("{}", "=".repeat(60).blue());
        println!("{}", "Short Put Screener".green().bold());
        println!("{}", "=".repeat(60).blue());
        println!();

        Self::print_config(report);
        Self::print_tickers(report);

        if report.config.ranking.includes_per_ticker() {
            for group in &report.per_ticker_top {
                Self::print_table(&format!("Top {} for {}", report.config.top_n, group.ticker), &group.candidates);
            }
        }
        if report.config.ranking.includes_global() {
            Self::print_table(&format!("Global top {}", report.config.top_n), &report.global_top);
        }

        Self::print_issues(report);

        println!("{}", "=".repeat(60).blue());
        println!("{}", "Summary".cyan().bold());
        println!("{}", "=".repeat(60).blue());
        println!("{} Candidates: {}", "✓".green(), report.all_candidates.len());
        println!("{} Highlighted: {}", "★".yellow(), report.highlighted().count());
        println!("{} Failed tickers: {}", "✗".red(), report.failed_tickers());
        println!("{} Time taken: {:.2}s", "⏱".yellow(), report.elapsed_ms as f64 / 1000.0);
        println!();
        Ok(())
    }
}
