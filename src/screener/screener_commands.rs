use super::config::{self, NotifierConfig, ScreenConfig};
use super::metrics;
use super::notifier::WebhookNotifier;
use super::orchestrator::Screener;
use super::report::{ConsoleReport, CsvReport, ReportSink};

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;
use tracing::error;

/// Screener command handler
pub struct ScreenerCommands;

impl ScreenerCommands {
    /// One full screening run: fetch, filter, rank, then publish to every sink
    pub async fn run_batch() -> Result<()> {
        println!("{}", "=".repeat(60).blue());
        println!("{}", "Put Screener Batch Run".green().bold());
        println!("{}", "=".repeat(60).blue());
        println!();

        let screen_config = ScreenConfig::from_env().context("Invalid screener configuration")?;
        let api_key = config::alpha_vantage_api_key();

        println!("{} Tickers: {}", "ℹ".blue(), screen_config.tickers.join(", ").yellow());
        println!("{} Max concurrent tickers: {}", "ℹ".blue(), screen_config.max_concurrent);
        if api_key.is_none() {
            println!("{} No Alpha Vantage key, fallback source disabled", "⚠".yellow());
        }
        println!();

        let screener = Arc::new(Screener::with_default_sources(
            screen_config,
            metrics::evaluation_date_today(),
            api_key,
        )?);

        println!("{}", "Screening tickers...".cyan());
        let report = screener.run().await.context("Screening run aborted")?;
        println!();

        ConsoleReport.publish(&report).await?;

        let csv = CsvReport::new(config::get_output_dir());
        csv.publish(&report).await.context("Failed to write CSV reports")?;
        println!(
            "{} CSV written: {} and {}",
            "✓".green(),
            csv.all_candidates_path().display(),
            csv.top_candidates_path().display()
        );

        // Notification failures never fail the run
        match WebhookNotifier::from_config(NotifierConfig::from_env()) {
            Ok(Some(notifier)) => match notifier.publish(&report).await {
                Ok(()) => println!("{} Notification published via {}", "✓".green(), notifier.name()),
                Err(e) => error!(error = %e, "Notification failed"),
            },
            Ok(None) => println!("{} No webhook configured, skipping notification", "ℹ".blue()),
            Err(e) => error!(error = %e, "Failed to build notifier"),
        }

        println!();
        println!("{}", "=".repeat(60).blue());
        println!("{}", "Done!".green().bold());
        println!("{}", "=".repeat(60).blue());

        Ok(())
    }

    /// Run API server mode
    pub async fn run_server(port: u16) -> Result<()> {
        println!("{}", "=".repeat(60).blue());
        println!("{}", "Put Screener API Server".green().bold());
        println!("{}", "=".repeat(60).blue());
        println!();

        crate::api_server_axum::start_server(port).await
    }
}
