use crate::screener::config::{self, ScreenConfig};
use crate::screener::{metrics, Screener, ScreenReport};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

// -----------------------------------------------
// API REQUEST/RESPONSE MODELS
// -----------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ScreenQuery {
    /// Comma-separated override of the configured tickers
    pub tickers: Option<String>,
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub processing_time_ms: Option<u64>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, start_time: Instant) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        }
    }

    fn err(error: impl ToString, start_time: Instant) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub fallback_enabled: bool,
}

// -----------------------------------------------
// APPLICATION STATE
// -----------------------------------------------

#[derive(Clone)]
pub struct AppState {
    base_config: Arc<ScreenConfig>,
    api_key: Option<String>,
}

impl AppState {
    pub fn new(base_config: ScreenConfig, api_key: Option<String>) -> Self {
        Self {
            base_config: Arc::new(base_config),
            api_key,
        }
    }

    /// Base configuration with the query's overrides applied
    fn config_for(&self, query: &ScreenQuery) -> ScreenConfig {
        let mut config = self.base_config.as_ref().clone();
        if let Some(raw) = &query.tickers {
            config.tickers = config::parse_tickers(raw);
        }
        if let Some(top_n) = query.top_n.filter(|n| *n > 0) {
            config.top_n = top_n;
        }
        config
    }
}

// -----------------------------------------------
// API HANDLERS
// -----------------------------------------------

/// GET /health
async fn health(State(app_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        fallback_enabled: app_state.api_key.is_some(),
    })
}

/// GET /api/config - the configuration screens run with
async fn get_config(State(app_state): State<AppState>) -> Json<ApiResponse<ScreenConfig>> {
    let start_time = Instant::now();
    Json(ApiResponse::ok(app_state.base_config.as_ref().clone(), start_time))
}

/// GET /api/screen?tickers=AAPL,MSFT&top_n=5 - run one screen and return the report
async fn run_screen(
    Query(query): Query<ScreenQuery>,
    State(app_state): State<AppState>,
) -> Result<Json<ApiResponse<ScreenReport>>, StatusCode> {
    let start_time = Instant::now();
    let screen_config = app_state.config_for(&query);

    if let Err(e) = screen_config.validate() {
        return Ok(Json(ApiResponse::err(e, start_time)));
    }

    let screener = Screener::with_default_sources(
        screen_config,
        metrics::evaluation_date_today(),
        app_state.api_key.clone(),
    )
    .map_err(|e| {
        error!(error = %e, "Failed to build quote sources");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    match Arc::new(screener).run().await {
        Ok(report) => {
            info!(candidates = report.all_candidates.len(), "Screen served");
            Ok(Json(ApiResponse::ok(report, start_time)))
        }
        Err(e) => Ok(Json(ApiResponse::err(e, start_time))),
    }
}

// -----------------------------------------------
// SERVER STARTUP
// -----------------------------------------------

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/config", get(get_config))
        .route("/api/screen", get(run_screen))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

pub async fn start_server(port: u16) -> Result<()> {
    let base_config = ScreenConfig::from_env()?;
    let app_state = AppState::new(base_config, config::alpha_vantage_api_key());
    let app = router(app_state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("🚀 Put Screener API running on http://{}", addr);
    println!("📋 Available endpoints:");
    println!("   GET  /health");
    println!("   GET  /api/config");
    println!("   GET  /api/screen?tickers=AAPL,MSFT&top_n=5");
    println!();

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_overrides_tickers_and_top_n() {
        let state = AppState::new(ScreenConfig::default(), None);
        let query = ScreenQuery {
            tickers: Some("tsla, f".to_string()),
            top_n: Some(3),
        };
        let config = state.config_for(&query);
        assert_eq!(config.tickers, vec!["TSLA".to_string(), "F".to_string()]);
        assert_eq!(config.top_n, 3);
    }

    #[test]
    fn test_zero_top_n_keeps_default() {
        let state = AppState::new(ScreenConfig::default(), None);
        let query = ScreenQuery {
            top_n: Some(0),
            ..Default::default()
        };
        assert_eq!(state.config_for(&query).top_n, config::DEFAULT_TOP_N);
    }
}
