use crate::screener::config;
use anyhow::{bail, Result};
use colored::Colorize;

pub const DEFAULT_PORT: u16 = 3001;

/// Process-level settings: which mode to run and where to listen
pub struct AppConfig {
    pub mode: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            mode: config::get_execution_mode(),
            port: Self::get_port(),
        }
    }

    /// Log configuration details for CI environments
    pub fn log_ci_config(&self) {
        if config::is_ci_environment() {
            println!("{}", "Running in CI environment".blue().bold());
            println!("{} Mode: {}", "→".cyan(), self.mode.yellow());

            if self.mode == "server" {
                println!("{} Server mode not supported in CI - switching to batch", "⚠".yellow());
            }
            println!();
        }
    }

    fn get_port() -> u16 {
        std::env::var("SCREENER_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn validate(&self) -> Result<()> {
        match self.mode.as_str() {
            "batch" | "server" => Ok(()),
            other => bail!("Unknown SCREENER_MODE '{}', expected 'batch' or 'server'", other),
        }
    }
}
