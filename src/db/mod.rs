use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::debug;

use crate::error::AppError;

pub mod credentials;
pub mod ledger;
pub mod migrations;
pub mod models;
pub mod profiles;
pub mod ranking;

pub use credentials::CredentialStore;
pub use ledger::RatingLedger;
pub use migrations::run_migrations;
pub use models::*;
pub use profiles::ProfileStore;
pub use ranking::RankEngine;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a pool with foreign keys enforced. In-memory databases need a single
/// connection, otherwise every connection sees its own empty database.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, AppError> {
    debug!(database_url, "📜 Opening database pool");

    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT)
        .journal_mode(if in_memory {
            SqliteJournalMode::Memory
        } else {
            SqliteJournalMode::Wal
        });

    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections.max(1));
    if in_memory {
        // Closing the last connection would drop the whole database.
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options.connect_with(options).await?;

    Ok(pool)
}
