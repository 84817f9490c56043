use super::config;
use super::error::ScreenerError;
use super::models::{Provenance, PutContract, UnderlyingSnapshot};
use async_trait::async_trait;
use rand::{seq::SliceRandom, thread_rng};
use reqwest::{header, Client, StatusCode};
use tracing::debug;

/// A market-data provider able to describe one ticker's underlying and put chain.
///
/// Implementations fail independently and never retry. Implied volatility
/// must leave the boundary on the percentage scale.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Short provider name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Provenance stamped on contracts this source returns
    fn provenance(&self) -> Provenance;

    async fn fetch_underlying(&self, ticker: &str) -> Result<UnderlyingSnapshot, ScreenerError>;

    async fn fetch_put_chain(&self, ticker: &str) -> Result<Vec<PutContract>, ScreenerError>;

    /// Underlying and put chain together. Sources that serve both from one
    /// response override this to avoid the duplicate request.
    async fn fetch_quotes(&self, ticker: &str) -> SourceQuotes {
        let (underlying, puts) = tokio::join!(self.fetch_underlying(ticker), self.fetch_put_chain(ticker));
        SourceQuotes {
            underlying,
            puts,
            warnings: Vec::new(),
        }
    }
}

/// Everything one source reported for one ticker.
#[derive(Debug)]
pub struct SourceQuotes {
    pub underlying: Result<UnderlyingSnapshot, ScreenerError>,
    pub puts: Result<Vec<PutContract>, ScreenerError>,
    /// Partial failures that still left usable data, e.g. a missing expiration page
    pub warnings: Vec<String>,
}

/// Convert a source-reported implied volatility fraction to percent.
pub fn fraction_to_percent(iv: Option<f64>) -> Option<f64> {
    iv.filter(|v| v.is_finite()).map(|v| v * 100.0)
}

/// Convert a float count (some feeds send `12.0`) to a non-negative integer.
pub fn to_count(value: Option<f64>) -> Option<u64> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u64)
}

// -----------------------------------------------
// SHARED HTTP PLUMBING
// -----------------------------------------------

/// GET a URL and return the body, mapping transport and status failures
/// onto the provider's error taxonomy.
pub async fn fetch_json_text(
    client: &Client,
    provider: &'static str,
    ticker: &str,
    url: &str,
) -> Result<String, ScreenerError> {
    let res = client
        .get(url)
        .header(header::ACCEPT, config::HEADER_ACCEPT_JSON)
        .send()
        .await
        .map_err(|e| ScreenerError::unavailable(provider, ticker, format!("request failed: {}", e)))?;

    let status = res.status();
    debug!(provider, ticker, status = status.as_u16(), "Quote response");

    if status == StatusCode::NOT_FOUND {
        return Err(ScreenerError::not_found(provider, ticker));
    }

    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        let preview: String = body.chars().take(200).collect();
        return Err(ScreenerError::unavailable(
            provider,
            ticker,
            format!("HTTP {}: {}", status, preview),
        ));
    }

    let text = res
        .text()
        .await
        .map_err(|e| ScreenerError::unavailable(provider, ticker, format!("failed to read body: {}", e)))?;

    let trimmed = text.trim();
    if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
        let preview: String = text.chars().take(200).collect();
        return Err(ScreenerError::unavailable(
            provider,
            ticker,
            format!("non-JSON response: {}", preview),
        ));
    }

    Ok(text)
}

/// Build the shared HTTP client: cookie store, rotating Accept-Language, browser UA
pub fn build_client() -> anyhow::Result<Client> {
    let mut headers = header::HeaderMap::new();

    let lang = config::ACCEPT_LANGUAGES
        .choose(&mut thread_rng())
        .copied()
        .unwrap_or("en-US,en;q=0.9");
    headers.insert(header::ACCEPT_LANGUAGE, header::HeaderValue::from_str(lang)?);
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));

    let client = Client::builder()
        .default_headers(headers)
        .cookie_store(true)
        .gzip(true)
        .user_agent(config::USER_AGENT)
        .timeout(config::HTTP_TIMEOUT)
        .build()?;

    Ok(client)
}
