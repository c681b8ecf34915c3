//! Environment-based configuration.

use std::path::PathBuf;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub nats_url: Option<String>,
    pub invoice_dir: PathBuf,
    pub currency: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?,
            port: std::env::var("PORT")
                .ok()
                .map(|p| p.parse())
                .transpose()
                .context("PORT must be a number")?
                .unwrap_or(8083),
            nats_url: std::env::var("NATS_URL").ok(),
            invoice_dir: std::env::var("INVOICE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("invoices")),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "USD".to_string()),
        })
    }
}
