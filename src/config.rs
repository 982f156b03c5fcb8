//! Environment-backed configuration with logged defaults.

use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub nats_url: Option<String>,
    pub currency: String,
    /// Merchant number the WhatsApp order summaries are addressed to.
    pub whatsapp_number: String,
    /// Seconds between notification outbox dispatch passes.
    pub notification_interval_secs: u64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            port: try_load("PORT", "8083"),
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            nats_url: env::var("NATS_URL").ok(),
            currency: try_load("CURRENCY", "MXN"),
            whatsapp_number: try_load("WHATSAPP_NUMBER", "5215512345678"),
            notification_interval_secs: try_load("NOTIFICATION_INTERVAL_SECS", "30"),
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
