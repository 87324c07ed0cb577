//! C9 — Local Store. The only component allowed to touch the embedded
//! SQLite database that holds profiles, settings, audit events, schema
//! snapshots, and ask/run history (spec §4.9). Every method here is narrow:
//! callers never get to hand this crate arbitrary SQL.

pub mod audit;
pub mod error;
pub mod history;
pub mod profiles;
pub mod settings;
pub mod snapshots;

pub use error::StoreError;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Fixed-width RFC3339 so `ORDER BY` on a TEXT column sorts the same as
/// chronological order — `to_rfc3339()` alone varies fractional-second width.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Handle to the embedded local store. `max_connections(1)` enforces the
/// single-writer discipline spec §4.9 requires; SQLite serializes writers
/// anyway, but capping the pool avoids `SQLITE_BUSY` churn under load.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// In-memory store for tests; never persisted to disk.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Run embedded migrations. Each step is stamped in sqlx's own
    /// `_sqlx_migrations` table; only unstamped steps execute, in order.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
