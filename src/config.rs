use std::{fmt::Display, str::FromStr, time::Duration};

use anyhow::Context;
use tracing::info;

use crate::store::RetryPolicy;

pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub max_connections: u32,
    pub recommender_url: Option<String>,
    pub recommender_timeout: Duration,
    pub retry: RetryPolicy,
    pub session_minutes: i64,
    pub seed_demo: bool,
}

impl Config {
    /// Reads the environment (and `.env`, if present).
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:8080")?,
            database_url: try_load("DATABASE_URL", "sqlite://badgerexchange.db?mode=rwc")?,
            max_connections: try_load("DB_MAX_CONNECTIONS", "16")?,
            recommender_url: dotenv::var("RECOMMENDER_URL").ok().filter(|url| !url.is_empty()),
            recommender_timeout: Duration::from_millis(try_load("RECOMMENDER_TIMEOUT_MS", "4000")?),
            retry: RetryPolicy {
                attempts: try_load("STORE_RETRY_ATTEMPTS", "3")?,
                base_delay: Duration::from_millis(try_load("STORE_RETRY_BASE_MS", "50")?),
            },
            session_minutes: try_load("SESSION_MINUTES", "60")?,
            seed_demo: try_load("SEED_DEMO", "false")?,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let value = dotenv::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    value
        .parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("invalid {key} value {value:?}"))
}
