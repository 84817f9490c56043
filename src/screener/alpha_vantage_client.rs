use super::config;
use super::error::ScreenerError;
use super::models::{AvDailyBar, AvDailySeries, AvNotice, AvOptionRow, AvOptionsResponse, Provenance, PutContract, UnderlyingSnapshot};
use super::quote_source::{self, QuoteSource};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;

const PROVIDER: &str = "alpha-vantage";

// -----------------------------------------------
// FALLBACK SOURCE: ALPHA VANTAGE
// -----------------------------------------------
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        Ok(Self {
            client: quote_source::build_client()?,
            api_key,
        })
    }
}

#[async_trait]
impl QuoteSource for AlphaVantageClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn provenance(&self) -> Provenance {
        Provenance::Fallback
    }

    async fn fetch_underlying(&self, ticker: &str) -> Result<UnderlyingSnapshot, ScreenerError> {
        let url = config::alpha_vantage_url("TIME_SERIES_DAILY", ticker, &self.api_key, &[("outputsize", "full")]);
        let text = quote_source::fetch_json_text(&self.client, PROVIDER, ticker, &url).await?;
        parse_daily_series(ticker, &text)
    }

    async fn fetch_put_chain(&self, ticker: &str) -> Result<Vec<PutContract>, ScreenerError> {
        let url = config::alpha_vantage_url("HISTORICAL_OPTIONS", ticker, &self.api_key, &[]);
        let text = quote_source::fetch_json_text(&self.client, PROVIDER, ticker, &url).await?;
        parse_put_chain(ticker, &text)
    }
}

// -----------------------------------------------
// RESPONSE MAPPING
// -----------------------------------------------

fn check_notice(ticker: &str, notice: &AvNotice) -> Result<(), ScreenerError> {
    if notice.error_message.is_some() {
        return Err(ScreenerError::not_found(PROVIDER, ticker));
    }
    // Note / Information are rate-limit and plan messages
    if let Some(message) = notice.note.as_ref().or(notice.information.as_ref()) {
        return Err(ScreenerError::unavailable(PROVIDER, ticker, message.clone()));
    }
    Ok(())
}

/// Latest close is the price; the 52-week range spans bars within 365 days of the latest bar.
pub fn parse_daily_series(ticker: &str, text: &str) -> Result<UnderlyingSnapshot, ScreenerError> {
    let response: AvDailySeries = serde_json::from_str(text).map_err(|e| {
        ScreenerError::unavailable(PROVIDER, ticker, format!("failed to parse daily series: {}", e))
    })?;
    check_notice(ticker, &response.notice)?;

    let series = response
        .series
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ScreenerError::not_found(PROVIDER, ticker))?;

    let bars: Vec<(NaiveDate, &AvDailyBar)> = series
        .iter()
        .filter_map(|(date, bar)| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok().map(|d| (d, bar)))
        .collect();

    let (latest_date, latest_bar) = bars
        .iter()
        .max_by_key(|(date, _)| *date)
        .ok_or_else(|| ScreenerError::DataIncomplete(format!("{}: {} has no dated bars", PROVIDER, ticker)))?;

    let price = latest_bar
        .close
        .filter(|p| *p > 0.0)
        .ok_or_else(|| ScreenerError::DataIncomplete(format!("{}: {} latest close missing", PROVIDER, ticker)))?;

    let window_start = *latest_date - chrono::Duration::days(365);
    let window = bars.iter().filter(|(date, _)| *date > window_start);

    let mut week52_low = price;
    let mut week52_high = price;
    for (_, bar) in window {
        if let Some(low) = bar.low.or(bar.close) {
            week52_low = week52_low.min(low);
        }
        if let Some(high) = bar.high.or(bar.close) {
            week52_high = week52_high.max(high);
        }
    }

    Ok(UnderlyingSnapshot {
        ticker: ticker.to_string(),
        price,
        week52_low,
        week52_high,
    })
}

pub fn parse_put_chain(ticker: &str, text: &str) -> Result<Vec<PutContract>, ScreenerError> {
    let response: AvOptionsResponse = serde_json::from_str(text).map_err(|e| {
        ScreenerError::unavailable(PROVIDER, ticker, format!("failed to parse options: {}", e))
    })?;
    check_notice(ticker, &response.notice)?;

    Ok(response
        .data
        .iter()
        .filter(|row| row.option_type.eq_ignore_ascii_case("put"))
        .filter_map(contract_from_row)
        .collect())
}

fn contract_from_row(row: &AvOptionRow) -> Option<PutContract> {
    let strike = row.strike.filter(|s| *s > 0.0)?;
    let expiration = NaiveDate::parse_from_str(row.expiration.trim(), "%Y-%m-%d").ok()?;

    Some(PutContract {
        strike,
        last_price: row.last.filter(|p| *p >= 0.0),
        bid: row.bid.filter(|b| *b >= 0.0),
        expiration,
        volume: quote_source::to_count(row.volume),
        implied_volatility: quote_source::fraction_to_percent(row.implied_volatility),
        open_interest: quote_source::to_count(row.open_interest),
        provenance: Provenance::Fallback,
    })
}
