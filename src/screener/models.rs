use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// -----------------------------------------------
// DOMAIN TYPES
// -----------------------------------------------

/// Point-in-time view of the underlying equity.
///
/// `week52_low <= price <= week52_high` is what a sane feed reports, but
/// nothing downstream relies on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnderlyingSnapshot {
    pub ticker: String,
    pub price: f64,
    pub week52_low: f64,
    pub week52_high: f64,
}

/// Which quote source(s) supplied a contract's final values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Primary,
    Fallback,
    Both,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Primary => "primary",
            Provenance::Fallback => "fallback",
            Provenance::Both => "both",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single put contract as reported by one source, or merged from two.
///
/// Implied volatility is always on the percentage scale (28.5, not 0.285).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PutContract {
    pub strike: f64,
    pub last_price: Option<f64>,
    pub bid: Option<f64>,
    pub expiration: NaiveDate,
    pub volume: Option<u64>,
    pub implied_volatility: Option<f64>,
    pub open_interest: Option<u64>,
    pub provenance: Provenance,
}

impl PutContract {
    pub fn new(strike: f64, last_price: Option<f64>, expiration: NaiveDate, provenance: Provenance) -> Self {
        Self {
            strike,
            last_price,
            bid: None,
            expiration,
            volume: None,
            implied_volatility: None,
            open_interest: None,
            provenance,
        }
    }

    pub fn key(&self) -> ContractKey {
        ContractKey::new(self.strike, self.expiration)
    }
}

/// Merge identity of a contract: strike (to a thousandth) plus expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractKey {
    strike_milli: i64,
    expiration: NaiveDate,
}

impl ContractKey {
    pub fn new(strike: f64, expiration: NaiveDate) -> Self {
        Self {
            strike_milli: (strike * 1000.0).round() as i64,
            expiration,
        }
    }
}

/// Values derived from a contract, its underlying price and the evaluation date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DerivedMetrics {
    pub days_to_expiration: i64,
    pub daily_yield_pct: f64,
    pub annualized_yield_pct: f64,
    pub break_even: f64,
    pub cushion_pct: f64,
}

/// A contract that passed every filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateResult {
    pub ticker: String,
    pub contract: PutContract,
    pub metrics: DerivedMetrics,
    pub highlighted: bool,
}

// -----------------------------------------------
// YAHOO FINANCE WIRE TYPES (v7/finance/options)
// -----------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct YahooOptionsResponse {
    #[serde(rename = "optionChain")]
    pub option_chain: YahooOptionChain,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooOptionChain {
    #[serde(default)]
    pub result: Vec<YahooChainResult>,

    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooChainResult {
    #[serde(rename = "underlyingSymbol")]
    pub underlying_symbol: Option<String>,

    #[serde(rename = "expirationDates", default)]
    pub expiration_dates: Vec<i64>,

    pub quote: Option<YahooQuote>,

    #[serde(default)]
    pub options: Vec<YahooExpiryOptions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooQuote {
    #[serde(rename = "regularMarketPrice")]
    pub regular_market_price: Option<f64>,

    #[serde(rename = "fiftyTwoWeekLow")]
    pub fifty_two_week_low: Option<f64>,

    #[serde(rename = "fiftyTwoWeekHigh")]
    pub fifty_two_week_high: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooExpiryOptions {
    #[serde(rename = "expirationDate")]
    pub expiration_date: i64,

    #[serde(default)]
    pub puts: Vec<YahooContract>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooContract {
    #[serde(rename = "contractSymbol")]
    pub contract_symbol: Option<String>,

    pub strike: Option<f64>,

    #[serde(rename = "lastPrice")]
    pub last_price: Option<f64>,

    pub bid: Option<f64>,

    pub volume: Option<f64>,

    #[serde(rename = "impliedVolatility")]
    pub implied_volatility: Option<f64>,

    #[serde(rename = "openInterest")]
    pub open_interest: Option<f64>,

    pub expiration: Option<i64>,
}

// -----------------------------------------------
// ALPHA VANTAGE WIRE TYPES
// -----------------------------------------------

/// Alpha Vantage reports errors and throttling as 200 responses with one of these keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvNotice {
    #[serde(rename = "Error Message")]
    pub error_message: Option<String>,

    #[serde(rename = "Note")]
    pub note: Option<String>,

    #[serde(rename = "Information")]
    pub information: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvDailySeries {
    #[serde(rename = "Time Series (Daily)")]
    pub series: Option<BTreeMap<String, AvDailyBar>>,

    #[serde(flatten)]
    pub notice: AvNotice,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvDailyBar {
    #[serde(rename = "2. high", deserialize_with = "lenient_f64", default)]
    pub high: Option<f64>,

    #[serde(rename = "3. low", deserialize_with = "lenient_f64", default)]
    pub low: Option<f64>,

    #[serde(rename = "4. close", deserialize_with = "lenient_f64", default)]
    pub close: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvOptionsResponse {
    #[serde(default)]
    pub data: Vec<AvOptionRow>,

    #[serde(flatten)]
    pub notice: AvNotice,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvOptionRow {
    #[serde(rename = "type", default)]
    pub option_type: String,

    #[serde(default)]
    pub expiration: String,

    #[serde(deserialize_with = "lenient_f64", default)]
    pub strike: Option<f64>,

    #[serde(deserialize_with = "lenient_f64", default)]
    pub last: Option<f64>,

    #[serde(deserialize_with = "lenient_f64", default)]
    pub bid: Option<f64>,

    #[serde(deserialize_with = "lenient_f64", default)]
    pub volume: Option<f64>,

    #[serde(deserialize_with = "lenient_f64", default)]
    pub open_interest: Option<f64>,

    #[serde(deserialize_with = "lenient_f64", default)]
    pub implied_volatility: Option<f64>,
}

/// Accepts a JSON number or a numeric string; anything else is treated as missing.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}
