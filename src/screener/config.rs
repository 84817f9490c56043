use super::error::ScreenerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

// -----------------------------------------------
// YAHOO FINANCE ENDPOINTS (PRIMARY SOURCE)
// -----------------------------------------------
pub const YAHOO_BASE_URL: &str = "https://query2.finance.yahoo.com";
pub const YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";
pub const YAHOO_CRUMB_URL: &str = "https://query2.finance.yahoo.com/v1/test/getcrumb";

pub fn yahoo_options_url(ticker: &str, expiration: Option<i64>, crumb: Option<&str>) -> String {
    let mut url = format!(
        "{}/v7/finance/options/{}",
        YAHOO_BASE_URL,
        urlencoding::encode(ticker)
    );

    let mut params = Vec::new();
    if let Some(date) = expiration {
        params.push(format!("date={}", date));
    }
    if let Some(crumb) = crumb {
        params.push(format!("crumb={}", urlencoding::encode(crumb)));
    }
    if !params.is_empty() {
        url.push('?');
        url.push_str(&params.join("&"));
    }
    url
}

// -----------------------------------------------
// ALPHA VANTAGE ENDPOINTS (FALLBACK SOURCE)
// -----------------------------------------------
pub const ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";

pub fn alpha_vantage_url(function: &str, ticker: &str, api_key: &str, extra: &[(&str, &str)]) -> String {
    let mut url = format!(
        "{}?function={}&symbol={}&apikey={}",
        ALPHA_VANTAGE_BASE_URL,
        function,
        urlencoding::encode(ticker),
        urlencoding::encode(api_key)
    );
    for (key, value) in extra {
        url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
    }
    url
}

// -----------------------------------------------
// HTTP CLIENT CONFIG
// -----------------------------------------------
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                               AppleWebKit/537.36 (KHTML, like Gecko) \
                               Chrome/131.0.0.0 Safari/537.36";

pub const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.8",
    "en-CA,en;q=0.9",
];

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);
pub const HEADER_ACCEPT_JSON: &str = "application/json, text/plain, */*";
pub const HEADER_ACCEPT_HTML: &str = "text/html";

// -----------------------------------------------
// SESSION WARMUP
// -----------------------------------------------
pub const WARMUP_DELAY_MS: u64 = 200;
/// Expiration pages requested in parallel for one ticker
pub const EXPIRATION_FETCH_CONCURRENCY: usize = 2;

// -----------------------------------------------
// CONCURRENCY LIMITS
// -----------------------------------------------
pub const DEFAULT_MAX_CONCURRENT: usize = 1;
pub const MAX_CONCURRENT_CAP: usize = 16;

// -----------------------------------------------
// NOTIFICATION
// -----------------------------------------------
// Discord rejects content over 2000 characters; leave room for the envelope.
pub const WEBHOOK_MESSAGE_CHAR_LIMIT: usize = 1900;
pub const DEFAULT_NOTIFY_BATCH_SIZE: usize = 5;
pub const DEFAULT_NOTIFY_DELAY_MS: u64 = 1000;

// -----------------------------------------------
// OUTPUT FILES
// -----------------------------------------------
pub const ALL_CANDIDATES_CSV: &str = "put_candidates_all.csv";
pub const TOP_CANDIDATES_CSV: &str = "put_candidates_top.csv";

// -----------------------------------------------
// SCREEN DEFAULTS
// -----------------------------------------------
pub const DEFAULT_TICKERS: &str = "AAPL,MSFT,GOOGL,AMZN,NVDA";
pub const DEFAULT_MAX_DTE: i64 = 60;
pub const DEFAULT_MIN_ANNUAL_YIELD: f64 = 40.0;
pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_ALERT_MIN_YIELD: f64 = 80.0;
pub const DEFAULT_ALERT_IV: f64 = 50.0;

// -----------------------------------------------
// SCREEN CONFIGURATION
// -----------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Moneyness {
    #[serde(rename = "OTM")]
    Otm,
    #[serde(rename = "ITM")]
    Itm,
    #[serde(rename = "ANY")]
    Any,
}

impl FromStr for Moneyness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OTM" => Ok(Moneyness::Otm),
            "ITM" => Ok(Moneyness::Itm),
            "ANY" => Ok(Moneyness::Any),
            other => Err(format!("unknown moneyness '{}'", other)),
        }
    }
}

impl fmt::Display for Moneyness {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Moneyness::Otm => write!(f, "OTM"),
            Moneyness::Itm => write!(f, "ITM"),
            Moneyness::Any => write!(f, "ANY"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RankingMode {
    Global,
    PerTicker,
    Both,
}

impl RankingMode {
    pub fn includes_global(&self) -> bool {
        matches!(self, RankingMode::Global | RankingMode::Both)
    }

    pub fn includes_per_ticker(&self) -> bool {
        matches!(self, RankingMode::PerTicker | RankingMode::Both)
    }
}

impl FromStr for RankingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(RankingMode::Global),
            "per-ticker" | "per_ticker" | "ticker" => Ok(RankingMode::PerTicker),
            "both" => Ok(RankingMode::Both),
            other => Err(format!("unknown ranking mode '{}'", other)),
        }
    }
}

impl fmt::Display for RankingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RankingMode::Global => write!(f, "global"),
            RankingMode::PerTicker => write!(f, "per-ticker"),
            RankingMode::Both => write!(f, "both"),
        }
    }
}

/// Which side of the alert volatility threshold counts as highlighted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityDirection {
    Above,
    Below,
}

impl FromStr for VolatilityDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "above" => Ok(VolatilityDirection::Above),
            "below" => Ok(VolatilityDirection::Below),
            other => Err(format!("unknown volatility direction '{}'", other)),
        }
    }
}

impl fmt::Display for VolatilityDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VolatilityDirection::Above => write!(f, "above"),
            VolatilityDirection::Below => write!(f, "below"),
        }
    }
}

/// Thresholds for the "highlighted opportunity" annotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertTier {
    pub min_annualized_yield: f64,
    pub iv_threshold: f64,
    pub iv_direction: VolatilityDirection,
}

/// Filter and ranking thresholds for one run. Optional fields are inactive when `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenConfig {
    pub tickers: Vec<String>,
    pub moneyness: Moneyness,
    pub max_days_to_expiration: i64,
    pub min_annualized_yield: f64,
    pub min_cushion: Option<f64>,
    pub min_volume: u64,
    pub min_open_interest: u64,
    pub min_bid: Option<f64>,
    pub min_implied_volatility: Option<f64>,
    pub max_implied_volatility: Option<f64>,
    pub top_n: usize,
    pub ranking: RankingMode,
    pub alert: AlertTier,
    pub max_concurrent: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            tickers: parse_tickers(DEFAULT_TICKERS),
            moneyness: Moneyness::Otm,
            max_days_to_expiration: DEFAULT_MAX_DTE,
            min_annualized_yield: DEFAULT_MIN_ANNUAL_YIELD,
            min_cushion: None,
            min_volume: 0,
            min_open_interest: 0,
            min_bid: None,
            min_implied_volatility: None,
            max_implied_volatility: None,
            top_n: DEFAULT_TOP_N,
            ranking: RankingMode::Both,
            alert: AlertTier {
                min_annualized_yield: DEFAULT_ALERT_MIN_YIELD,
                iv_threshold: DEFAULT_ALERT_IV,
                iv_direction: VolatilityDirection::Above,
            },
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl ScreenConfig {
    /// Build configuration from process environment variables
    pub fn from_env() -> Result<Self, ScreenerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup. Unparsable values fall back
    /// to their defaults with a warning; an empty ticker list is fatal.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScreenerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let tickers = match lookup("SCREENER_TICKERS") {
            Some(raw) => parse_tickers(&raw),
            None => defaults.tickers.clone(),
        };

        let max_concurrent = parse_or(&lookup, "SCREENER_MAX_CONCURRENT", defaults.max_concurrent)
            .clamp(1, MAX_CONCURRENT_CAP);

        let config = Self {
            tickers,
            moneyness: parse_or(&lookup, "SCREENER_MONEYNESS", defaults.moneyness),
            max_days_to_expiration: positive_or(
                parse_or(&lookup, "SCREENER_MAX_DTE", defaults.max_days_to_expiration),
                "SCREENER_MAX_DTE",
                defaults.max_days_to_expiration,
            ),
            min_annualized_yield: parse_threshold_or(&lookup, "SCREENER_MIN_ANNUAL_YIELD", defaults.min_annualized_yield),
            min_cushion: parse_threshold(&lookup, "SCREENER_MIN_CUSHION"),
            min_volume: parse_or(&lookup, "SCREENER_MIN_VOLUME", defaults.min_volume),
            min_open_interest: parse_or(&lookup, "SCREENER_MIN_OPEN_INTEREST", defaults.min_open_interest),
            min_bid: parse_threshold(&lookup, "SCREENER_MIN_BID"),
            min_implied_volatility: parse_threshold(&lookup, "SCREENER_MIN_IV"),
            max_implied_volatility: parse_threshold(&lookup, "SCREENER_MAX_IV"),
            top_n: positive_or(
                parse_or(&lookup, "SCREENER_TOP_N", defaults.top_n),
                "SCREENER_TOP_N",
                defaults.top_n,
            ),
            ranking: parse_or(&lookup, "SCREENER_RANKING", defaults.ranking),
            alert: AlertTier {
                min_annualized_yield: parse_threshold_or(
                    &lookup,
                    "SCREENER_ALERT_MIN_YIELD",
                    defaults.alert.min_annualized_yield,
                ),
                iv_threshold: parse_threshold_or(&lookup, "SCREENER_ALERT_IV", defaults.alert.iv_threshold),
                iv_direction: parse_or(&lookup, "SCREENER_ALERT_IV_DIRECTION", defaults.alert.iv_direction),
            },
            max_concurrent,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no run can use
    pub fn validate(&self) -> Result<(), ScreenerError> {
        if self.tickers.is_empty() {
            return Err(ScreenerError::Configuration(
                "ticker list is empty after parsing".to_string(),
            ));
        }

        let thresholds = [
            ("min annualized yield", Some(self.min_annualized_yield)),
            ("min cushion", self.min_cushion),
            ("min bid", self.min_bid),
            ("min implied volatility", self.min_implied_volatility),
            ("max implied volatility", self.max_implied_volatility),
            ("alert yield", Some(self.alert.min_annualized_yield)),
            ("alert implied volatility", Some(self.alert.iv_threshold)),
        ];
        for (name, value) in thresholds {
            if let Some(value) = value.filter(|v| !v.is_finite()) {
                return Err(ScreenerError::Configuration(format!("{} must be finite, got {}", name, value)));
            }
        }

        if let (Some(min), Some(max)) = (self.min_implied_volatility, self.max_implied_volatility) {
            if min > max {
                return Err(ScreenerError::Configuration(format!(
                    "minimum implied volatility {} exceeds maximum {}",
                    min, max
                )));
            }
        }

        Ok(())
    }
}

/// Split a comma-separated ticker list: trimmed, upper-cased, de-duplicated, order kept.
pub fn parse_tickers(raw: &str) -> Vec<String> {
    let mut tickers: Vec<String> = Vec::new();
    for ticker in raw.split(',').map(|t| t.trim().to_ascii_uppercase()) {
        if !ticker.is_empty() && !tickers.contains(&ticker) {
            tickers.push(ticker);
        }
    }
    tickers
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) if raw.trim().is_empty() => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, default = %default, "Invalid configuration value, using default");
                default
            }
        },
    }
}

fn parse_optional<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    if raw.trim().is_empty() {
        return None;
    }
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Invalid configuration value, threshold disabled");
            None
        }
    }
}

/// Float thresholds must be finite; NaN would make every comparison pass
fn parse_threshold_or<F>(lookup: &F, key: &str, default: f64) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default);
    if value.is_finite() {
        value
    } else {
        warn!(key, value = %value, default = %default, "Non-finite configuration value, using default");
        default
    }
}

fn parse_threshold<F>(lookup: &F, key: &str) -> Option<f64>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_optional::<f64, F>(lookup, key) {
        Some(value) if !value.is_finite() => {
            warn!(key, value = %value, "Non-finite configuration value, threshold disabled");
            None
        }
        other => other,
    }
}

fn positive_or<T>(value: T, key: &str, default: T) -> T
where
    T: PartialOrd + Default + fmt::Display,
{
    if value > T::default() {
        value
    } else {
        warn!(key, value = %value, default = %default, "Configuration value must be positive, using default");
        default
    }
}

// -----------------------------------------------
// NOTIFIER CONFIGURATION
// -----------------------------------------------

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub webhook_url: Option<String>,
    pub batch_size: usize,
    pub min_delay: Duration,
    pub char_limit: usize,
}

impl NotifierConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let batch_size = parse_or(&lookup, "SCREENER_NOTIFY_BATCH_SIZE", DEFAULT_NOTIFY_BATCH_SIZE);
        Self {
            webhook_url: lookup("SCREENER_WEBHOOK_URL").filter(|url| !url.trim().is_empty()),
            batch_size: positive_or(batch_size, "SCREENER_NOTIFY_BATCH_SIZE", DEFAULT_NOTIFY_BATCH_SIZE),
            min_delay: Duration::from_millis(parse_or(&lookup, "SCREENER_NOTIFY_DELAY_MS", DEFAULT_NOTIFY_DELAY_MS)),
            char_limit: WEBHOOK_MESSAGE_CHAR_LIMIT,
        }
    }
}

// -----------------------------------------------
// RUNTIME CONFIGURATION
// -----------------------------------------------

/// Get the execution mode from environment or default to batch
pub fn get_execution_mode() -> String {
    std::env::var("SCREENER_MODE").unwrap_or_else(|_| "batch".to_string())
}

/// Directory the CSV reports are written to
pub fn get_output_dir() -> String {
    std::env::var("SCREENER_OUTPUT_DIR").unwrap_or_else(|_| ".".to_string())
}

/// Alpha Vantage key; `API_KEY` is accepted for older deployments
pub fn alpha_vantage_api_key() -> Option<String> {
    std::env::var("ALPHA_VANTAGE_API_KEY")
        .or_else(|_| std::env::var("API_KEY"))
        .ok()
        .filter(|key| !key.trim().is_empty())
}

/// Check if running in CI/automated environment
pub fn is_ci_environment() -> bool {
    std::env::var("CI").is_ok() || std::env::var("GITHUB_ACTIONS").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yahoo_options_url() {
        assert_eq!(
            yahoo_options_url("BRK.B", None, None),
            "https://query2.finance.yahoo.com/v7/finance/options/BRK.B"
        );
        assert_eq!(
            yahoo_options_url("AAPL", Some(1750377600), Some("a/b")),
            "https://query2.finance.yahoo.com/v7/finance/options/AAPL?date=1750377600&crumb=a%2Fb"
        );
    }

    #[test]
    fn test_alpha_vantage_url() {
        let url = alpha_vantage_url("TIME_SERIES_DAILY", "AAPL", "KEY", &[("outputsize", "full")]);
        assert_eq!(
            url,
            "https://www.alphavantage.co/query?function=TIME_SERIES_DAILY&symbol=AAPL&apikey=KEY&outputsize=full"
        );
    }

    #[test]
    fn test_ranking_mode_parsing() {
        assert_eq!("per-ticker".parse::<RankingMode>().unwrap(), RankingMode::PerTicker);
        assert!(RankingMode::Both.includes_global());
        assert!(RankingMode::Both.includes_per_ticker());
        assert!(!RankingMode::Global.includes_per_ticker());
    }
}
