use super::config::{self, NotifierConfig};
use super::error::ScreenerError;
use super::models::CandidateResult;
use super::orchestrator::ScreenReport;
use super::quote_source;
use super::report::ReportSink;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Delivers one chat message.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), ScreenerError>;
}

// -----------------------------------------------
// WEBHOOK TRANSPORT
// -----------------------------------------------

/// Posts Discord-style `{"content": ...}` payloads to a webhook URL.
pub struct WebhookTransport {
    client: Client,
    url: String,
}

impl WebhookTransport {
    pub fn new(url: String) -> anyhow::Result<Self> {
        Ok(Self {
            client: quote_source::build_client()?,
            url,
        })
    }
}

#[async_trait]
impl NotificationTransport for WebhookTransport {
    async fn send(&self, text: &str) -> Result<(), ScreenerError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "content": text }))
            .send()
            .await
            .map_err(|e| ScreenerError::NotificationTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScreenerError::NotificationTransport(format!(
                "webhook returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }
        Ok(())
    }
}

// -----------------------------------------------
// MESSAGE BUILDING
// -----------------------------------------------

fn candidate_line(candidate: &CandidateResult) -> String {
    let iv = candidate
        .contract
        .implied_volatility
        .map(|iv| format!("{:.1}%", iv))
        .unwrap_or_else(|| "n/a".to_string());
    let last = candidate
        .contract
        .last_price
        .map(|p| format!("{:.2}", p))
        .unwrap_or_default();

    format!(
        "{}{} {:.2}P {} ({}d) last {} | annual {:.2}% | cushion {:.2}% | IV {}",
        if candidate.highlighted { "🔥 " } else { "" },
        candidate.ticker,
        candidate.contract.strike,
        candidate.contract.expiration,
        candidate.metrics.days_to_expiration,
        last,
        candidate.metrics.annualized_yield_pct,
        candidate.metrics.cushion_pct,
        iv
    )
}

/// Split the top candidates into message texts of at most `batch_size`
/// candidates each. A text longer than `char_limit` characters is swapped for
/// a pointer to the CSV output.
pub fn build_messages(report: &ScreenReport, batch_size: usize, char_limit: usize) -> Vec<String> {
    let top = report.top_candidates();
    if top.is_empty() {
        return vec![format!(
            "**Put screener {}**: no candidates passed the filters.",
            report.evaluation_date
        )];
    }

    let batches: Vec<&[CandidateResult]> = top.chunks(batch_size.max(1)).collect();
    let total = batches.len();

    batches
        .into_iter()
        .enumerate()
        .map(|(i, batch)| {
            let mut text = format!("**Put screener {}** ({}/{})", report.evaluation_date, i + 1, total);
            for candidate in batch {
                text.push('\n');
                text.push_str(&candidate_line(candidate));
            }

            if text.chars().count() > char_limit {
                format!(
                    "**Put screener {}** ({}/{}): message too long, see {} for details.",
                    report.evaluation_date,
                    i + 1,
                    total,
                    config::TOP_CANDIDATES_CSV
                )
            } else {
                text
            }
        })
        .collect()
}

// -----------------------------------------------
// NOTIFIER
// -----------------------------------------------

pub struct WebhookNotifier {
    transport: Arc<dyn NotificationTransport>,
    config: NotifierConfig,
}

impl WebhookNotifier {
    pub fn new(transport: Arc<dyn NotificationTransport>, config: NotifierConfig) -> Self {
        Self { transport, config }
    }

    /// `None` when no webhook URL is configured.
    pub fn from_config(config: NotifierConfig) -> anyhow::Result<Option<Self>> {
        let Some(url) = config.webhook_url.clone() else {
            return Ok(None);
        };
        let transport = Arc::new(WebhookTransport::new(url)?);
        Ok(Some(Self::new(transport, config)))
    }

    /// Send every batch in order, waiting `min_delay` between sends.
    /// Stops at the first failed send. Returns `(sent, total)` batches.
    pub async fn notify(&self, report: &ScreenReport) -> (usize, usize) {
        let messages = build_messages(report, self.config.batch_size, self.config.char_limit);
        let total = messages.len();
        let mut sent = 0;

        for (i, message) in messages.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.min_delay).await;
            }

            if let Err(e) = self.transport.send(message).await {
                error!(error = %e, batch = i + 1, total, "Notification failed, skipping remaining batches");
                return (sent, total);
            }
            sent += 1;
        }

        info!(batches = sent, "Notifications sent");
        (sent, total)
    }
}

#[async_trait]
impl ReportSink for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn publish(&self, report: &ScreenReport) -> Result<(), ScreenerError> {
        let (sent, total) = self.notify(report).await;
        if sent < total {
            warn!(sent, total, "Notification incomplete");
        }
        Ok(())
    }
}
