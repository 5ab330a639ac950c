use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub podscan_api_key: String,
    pub podscan_base_url: Option<String>,
    pub openai_api_key: String,
    pub google_service_account_email: String,
    pub google_private_key: String,
    /// Range read from each consumer's sheet; identifiers sit in the
    /// first column.
    pub sheets_identifier_range: String,
    pub stale_days: i64,
    pub time_budget_secs: u64,
    pub sweep_horizon_days: i64,
    /// 6-field cron expression for the nightly cache sweep.
    pub sweep_schedule: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            podscan_api_key: env::var("PODSCAN_API_KEY")
                .context("PODSCAN_API_KEY must be set")?,
            podscan_base_url: env::var("PODSCAN_BASE_URL").ok(),
            openai_api_key: env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set")?,
            google_service_account_email: env::var("GOOGLE_SERVICE_ACCOUNT_EMAIL")
                .context("GOOGLE_SERVICE_ACCOUNT_EMAIL must be set")?,
            google_private_key: env::var("GOOGLE_PRIVATE_KEY")
                .context("GOOGLE_PRIVATE_KEY must be set")?
                // .env files carry the PEM with escaped newlines
                .replace("\\n", "\n"),
            sheets_identifier_range: env::var("SHEETS_IDENTIFIER_RANGE")
                .unwrap_or_else(|_| "Podcasts!A2:A".to_string()),
            stale_days: env::var("CACHE_STALE_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .context("CACHE_STALE_DAYS must be a valid number")?,
            time_budget_secs: env::var("SYNC_TIME_BUDGET_SECS")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("SYNC_TIME_BUDGET_SECS must be a valid number")?,
            sweep_horizon_days: env::var("CACHE_SWEEP_HORIZON_DAYS")
                .unwrap_or_else(|_| "180".to_string())
                .parse()
                .context("CACHE_SWEEP_HORIZON_DAYS must be a valid number")?,
            sweep_schedule: env::var("CACHE_SWEEP_SCHEDULE")
                .unwrap_or_else(|_| "0 0 3 * * *".to_string()),
        })
    }
}
