use anyhow::Result;
use colored::Colorize;
use put_screener::app_config::AppConfig;
use put_screener::logging;
use put_screener::screener::config;
use put_screener::screener::screener_commands::ScreenerCommands;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;

    let app_config = AppConfig::from_env();
    app_config.validate()?;
    app_config.log_ci_config();

    match app_config.mode.as_str() {
        "server" if config::is_ci_environment() => {
            println!("{} CI only supports batch mode, running batch instead", "ℹ".blue());
            ScreenerCommands::run_batch().await?;
        }
        "server" => ScreenerCommands::run_server(app_config.port).await?,
        _ => ScreenerCommands::run_batch().await?,
    }

    Ok(())
}
