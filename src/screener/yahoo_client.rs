use super::config;
use super::error::ScreenerError;
use super::models::{
    Provenance, PutContract, UnderlyingSnapshot, YahooChainResult, YahooExpiryOptions, YahooOptionsResponse,
};
use super::quote_source::{self, QuoteSource, SourceQuotes};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const PROVIDER: &str = "yahoo";

/// Cookie/crumb pair Yahoo expects on API calls
#[derive(Debug, Clone, Default)]
struct YahooSession {
    crumb: Option<String>,
}

// -----------------------------------------------
// PRIMARY SOURCE: YAHOO FINANCE OPTIONS API
// -----------------------------------------------
pub struct YahooClient {
    client: Client,
    session: RwLock<Option<YahooSession>>,
    evaluation_date: NaiveDate,
    horizon_days: i64,
}

impl YahooClient {
    /// Expirations further than `horizon_days` past `evaluation_date` are never requested.
    pub fn new(evaluation_date: NaiveDate, horizon_days: i64) -> anyhow::Result<Self> {
        Ok(Self {
            client: quote_source::build_client()?,
            session: RwLock::new(None),
            evaluation_date,
            horizon_days,
        })
    }

    /// Establish cookies and fetch a crumb (only once per client)
    async fn session(&self) -> YahooSession {
        if let Some(session) = self.session.read().await.as_ref() {
            return session.clone();
        }

        let mut guard = self.session.write().await;
        if let Some(session) = guard.as_ref() {
            return session.clone();
        }

        // fc.yahoo.com answers 404 but sets the consent cookie we need
        if let Err(e) = self
            .client
            .get(config::YAHOO_COOKIE_URL)
            .header("Accept", config::HEADER_ACCEPT_HTML)
            .send()
            .await
        {
            warn!(error = %e, "Yahoo session warmup failed");
        }
        tokio::time::sleep(Duration::from_millis(config::WARMUP_DELAY_MS)).await;

        let crumb = match self.client.get(config::YAHOO_CRUMB_URL).send().await {
            Ok(res) if res.status().is_success() => res
                .text()
                .await
                .ok()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty() && !c.starts_with('{')),
            Ok(res) => {
                warn!(status = res.status().as_u16(), "Yahoo crumb request rejected");
                None
            }
            Err(e) => {
                warn!(error = %e, "Yahoo crumb request failed");
                None
            }
        };

        let session = YahooSession { crumb };
        *guard = Some(session.clone());
        session
    }

    /// Fetch one options page; `expiration` selects a specific expiry (epoch seconds)
    async fn fetch_chain_page(&self, ticker: &str, expiration: Option<i64>) -> Result<YahooChainResult, ScreenerError> {
        let session = self.session().await;
        let url = config::yahoo_options_url(ticker, expiration, session.crumb.as_deref());
        let text = quote_source::fetch_json_text(&self.client, PROVIDER, ticker, &url).await?;
        parse_chain_page(ticker, &text)
    }

    fn within_horizon(&self, expiration_epoch: i64) -> bool {
        epoch_to_date(expiration_epoch)
            .map(|date| {
                let days = (date - self.evaluation_date).num_days();
                days > 0 && days <= self.horizon_days
            })
            .unwrap_or(false)
    }
}

#[async_trait]
impl QuoteSource for YahooClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn provenance(&self) -> Provenance {
        Provenance::Primary
    }

    async fn fetch_underlying(&self, ticker: &str) -> Result<UnderlyingSnapshot, ScreenerError> {
        let page = self.fetch_chain_page(ticker, None).await?;
        snapshot_from_page(ticker, &page)
    }

    async fn fetch_put_chain(&self, ticker: &str) -> Result<Vec<PutContract>, ScreenerError> {
        let first_page = self.fetch_chain_page(ticker, None).await?;
        let (contracts, _) = self.collect_puts(ticker, &first_page).await;
        Ok(contracts)
    }

    /// One undated page serves both the quote and the nearest expiry.
    async fn fetch_quotes(&self, ticker: &str) -> SourceQuotes {
        let first_page = match self.fetch_chain_page(ticker, None).await {
            Ok(page) => page,
            Err(e) => {
                let puts = Err(ScreenerError::unavailable(PROVIDER, ticker, e.to_string()));
                return SourceQuotes {
                    underlying: Err(e),
                    puts,
                    warnings: Vec::new(),
                };
            }
        };

        let underlying = snapshot_from_page(ticker, &first_page);
        let (contracts, warnings) = self.collect_puts(ticker, &first_page).await;

        SourceQuotes {
            underlying,
            puts: Ok(contracts),
            warnings,
        }
    }
}

impl YahooClient {
    /// Puts from the first page plus every other in-horizon expiration.
    /// Failed expiration pages are skipped and reported as warnings.
    async fn collect_puts(&self, ticker: &str, first_page: &YahooChainResult) -> (Vec<PutContract>, Vec<String>) {
        let mut contracts = Vec::new();
        let mut fetched: Vec<i64> = Vec::new();

        for options in first_page.options.iter() {
            if self.within_horizon(options.expiration_date) {
                contracts.extend(contracts_from_options(options, self.provenance()));
            }
            fetched.push(options.expiration_date);
        }

        let pending: Vec<i64> = first_page
            .expiration_dates
            .iter()
            .copied()
            .filter(|epoch| !fetched.contains(epoch) && self.within_horizon(*epoch))
            .collect();

        debug!(ticker, expirations = pending.len() + fetched.len(), "Yahoo expirations in horizon");

        let pages: Vec<(i64, Result<YahooChainResult, ScreenerError>)> = stream::iter(pending)
            .map(move |epoch| async move { (epoch, self.fetch_chain_page(ticker, Some(epoch)).await) })
            .buffered(config::EXPIRATION_FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut failed = Vec::new();
        for (epoch, page) in pages {
            match page {
                Ok(page) => {
                    for options in page.options.iter() {
                        contracts.extend(contracts_from_options(options, self.provenance()));
                    }
                }
                Err(e) => {
                    warn!(ticker, expiration = epoch, error = %e, "Yahoo expiration fetch failed");
                    failed.push(epoch);
                }
            }
        }

        (contracts, expiration_gap_warning(&failed).into_iter().collect())
    }
}

// -----------------------------------------------
// RESPONSE MAPPING
// -----------------------------------------------

pub fn parse_chain_page(ticker: &str, text: &str) -> Result<YahooChainResult, ScreenerError> {
    let response: YahooOptionsResponse = serde_json::from_str(text).map_err(|e| {
        ScreenerError::unavailable(PROVIDER, ticker, format!("failed to parse option chain: {}", e))
    })?;

    if let Some(error) = response.option_chain.error.filter(|e| !e.is_null()) {
        return Err(ScreenerError::unavailable(PROVIDER, ticker, error.to_string()));
    }

    response
        .option_chain
        .result
        .into_iter()
        .next()
        .ok_or_else(|| ScreenerError::not_found(PROVIDER, ticker))
}

pub fn snapshot_from_page(ticker: &str, page: &YahooChainResult) -> Result<UnderlyingSnapshot, ScreenerError> {
    let quote = page
        .quote
        .as_ref()
        .ok_or_else(|| ScreenerError::DataIncomplete(format!("{}: {} quote missing", PROVIDER, ticker)))?;

    let price = quote
        .regular_market_price
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| ScreenerError::DataIncomplete(format!("{}: {} has no market price", PROVIDER, ticker)))?;

    Ok(UnderlyingSnapshot {
        ticker: ticker.to_string(),
        price,
        week52_low: quote.fifty_two_week_low.unwrap_or(price),
        week52_high: quote.fifty_two_week_high.unwrap_or(price),
    })
}

pub fn contracts_from_options(options: &YahooExpiryOptions, provenance: Provenance) -> Vec<PutContract> {
    options
        .puts
        .iter()
        .filter_map(|put| {
            let strike = put.strike.filter(|s| s.is_finite() && *s > 0.0)?;
            let expiration = epoch_to_date(put.expiration.unwrap_or(options.expiration_date))?;

            Some(PutContract {
                strike,
                last_price: put.last_price.filter(|p| p.is_finite() && *p >= 0.0),
                bid: put.bid.filter(|b| b.is_finite() && *b >= 0.0),
                expiration,
                volume: quote_source::to_count(put.volume),
                implied_volatility: quote_source::fraction_to_percent(put.implied_volatility),
                open_interest: quote_source::to_count(put.open_interest),
                provenance,
            })
        })
        .collect()
}

/// Summary line for expiration pages that could not be fetched
pub fn expiration_gap_warning(failed: &[i64]) -> Option<String> {
    if failed.is_empty() {
        return None;
    }
    let dates: Vec<String> = failed
        .iter()
        .map(|epoch| epoch_to_date(*epoch).map(|d| d.to_string()).unwrap_or_else(|| epoch.to_string()))
        .collect();
    Some(format!(
        "{}: {} expiration page(s) failed ({})",
        PROVIDER,
        failed.len(),
        dates.join(", ")
    ))
}

/// Yahoo expirations are midnight UTC epochs of the expiry date
pub fn epoch_to_date(epoch: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(epoch, 0).map(|dt| dt.date_naive())
}
