use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use cc_archive::index::{DEFAULT_INDEX_URL, DEFAULT_STORAGE_URL};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub nats_url: String,
    pub port: u16,
    /// Input artifact: one domain per row, first column
    pub domains_csv: PathBuf,
    /// Summary artifact rewritten at the end of every run
    pub output_csv: PathBuf,
    pub cc_index_url: String,
    pub cc_storage_url: String,
    /// Ranged archive reads in flight per domain
    pub fetch_concurrency: usize,
    /// SMTP probes in flight per domain
    pub verify_concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://emails.db?mode=rwc".to_string()),
            nats_url: env::var("NATS_URL")
                .unwrap_or_else(|_| "nats://localhost:4222".to_string()),
            port: parse_var("PORT", 8080).context("PORT must be a valid number")?,
            domains_csv: env::var("DOMAINS_CSV")
                .unwrap_or_else(|_| "domains.csv".to_string())
                .into(),
            output_csv: env::var("OUTPUT_CSV")
                .unwrap_or_else(|_| "emails.csv".to_string())
                .into(),
            cc_index_url: env::var("CC_INDEX_URL")
                .unwrap_or_else(|_| DEFAULT_INDEX_URL.to_string()),
            cc_storage_url: env::var("CC_STORAGE_URL")
                .unwrap_or_else(|_| DEFAULT_STORAGE_URL.to_string()),
            fetch_concurrency: parse_var("FETCH_CONCURRENCY", 4)
                .context("FETCH_CONCURRENCY must be a positive number")?,
            verify_concurrency: parse_var("VERIFY_CONCURRENCY", 4)
                .context("VERIFY_CONCURRENCY must be a positive number")?,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => Ok(raw.trim().parse()?),
        Err(_) => Ok(default),
    }
}
