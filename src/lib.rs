pub mod api_server_axum;
pub mod app_config;
pub mod logging;
pub mod screener;
pub mod utility;
