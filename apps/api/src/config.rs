use std::time::Duration;

use anyhow::{Context, Result};

use crate::persistence::save_controller::DEFAULT_DEBOUNCE_WINDOW;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Quiet period before a burst of edits is written.
    pub save_debounce: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let save_debounce = match std::env::var("SAVE_DEBOUNCE_MS") {
            Ok(ms) => Duration::from_millis(
                ms.parse::<u64>()
                    .context("SAVE_DEBOUNCE_MS must be a number of milliseconds")?,
            ),
            Err(_) => DEFAULT_DEBOUNCE_WINDOW,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            save_debounce,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
