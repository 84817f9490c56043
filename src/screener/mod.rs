pub mod alpha_vantage_client;
pub mod config;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod models;
pub mod notifier;
pub mod orchestrator;
pub mod quote_source;
pub mod ranker;
pub mod reconciler;
pub mod report;
pub mod screener_commands;
pub mod yahoo_client;

// Re-exports (public API)
pub use alpha_vantage_client::AlphaVantageClient;
pub use config::{AlertTier, Moneyness, NotifierConfig, RankingMode, ScreenConfig, VolatilityDirection};
pub use error::ScreenerError;
pub use filter::Rejection;
pub use metrics::{compute_metrics, Exclusion};
pub use models::{CandidateResult, ContractKey, DerivedMetrics, Provenance, PutContract, UnderlyingSnapshot};
pub use notifier::{NotificationTransport, WebhookNotifier, WebhookTransport};
pub use orchestrator::{IssueSeverity, ScreenReport, Screener, TickerIssue, TickerSummary};
pub use quote_source::{QuoteSource, SourceQuotes};
pub use ranker::TickerGroup;
pub use report::{ConsoleReport, CsvReport, ReportSink};
pub use yahoo_client::YahooClient;
