use thiserror::Error;

/// Error taxonomy for a screening run.
///
/// Only `Configuration` is run-fatal. Source errors are scoped to one ticker
/// and one provider, and notification errors stop the notifier only.
#[derive(Debug, Error)]
pub enum ScreenerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{provider}: no data for {ticker}")]
    NotFound { provider: &'static str, ticker: String },

    #[error("{provider} unavailable for {ticker}: {reason}")]
    SourceUnavailable {
        provider: &'static str,
        ticker: String,
        reason: String,
    },

    #[error("Incomplete data: {0}")]
    DataIncomplete(String),

    #[error("Notification transport error: {0}")]
    NotificationTransport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ScreenerError {
    pub fn unavailable(provider: &'static str, ticker: &str, reason: impl Into<String>) -> Self {
        ScreenerError::SourceUnavailable {
            provider,
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    pub fn not_found(provider: &'static str, ticker: &str) -> Self {
        ScreenerError::NotFound {
            provider,
            ticker: ticker.to_string(),
        }
    }
}
