//! SQLite-backed document store.
//!
//! Tables mirror the persisted collections: `users`, `listings`,
//! `conversations` and the per-conversation `messages`. Owner and
//! participant checks happen here, at the data-access boundary, so every
//! caller gets the same [`AppError::PermissionDenied`] behaviour.
//!
//! [`AppError::PermissionDenied`]: crate::AppError::PermissionDenied

mod conversations;
mod listings;
mod retry;
mod seed;
mod users;

use std::{str::FromStr, time::Duration};

use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, SqlitePool};
use tracing::info;

use crate::{include_res, live::ChangeHub, AppResult};

pub use conversations::{canonical_pair, conversation_key, InboxEntry};
pub use retry::RetryPolicy;
pub use seed::{demo_seed, SeedData};

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    hub: ChangeHub,
    retry: RetryPolicy,
}

impl Store {
    pub async fn connect(url: &str, max_connections: u32) -> AppResult<Store> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!("connected to {url}");
        Ok(Store::from_pool(pool))
    }

    /// A private, migrated in-memory store.
    pub async fn in_memory() -> AppResult<Store> {
        // every connection to :memory: is its own database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Store::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Store {
        Store {
            pool,
            hub: ChangeHub::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::raw_sql(include_res!(str, "/schema.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
