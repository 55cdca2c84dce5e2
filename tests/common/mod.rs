#![allow(dead_code)]

use std::time::Duration;

use skillgate::crypto::HashParams;
use skillgate::db::{self, run_migrations};
use skillgate::elo::EloConfig;
use skillgate::{Config, Services};
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const CHECK_FLOOR: Duration = Duration::from_millis(200);
pub const RESERVED_ID_THRESHOLD: i64 = 100;

/// Cheap Argon2 cost so tests stay fast.
pub const TEST_HASH: HashParams = HashParams {
    memory_kib: 1024,
    iterations: 1,
    parallelism: 1,
    salt_len: 16,
    output_len: 30,
};

pub fn config() -> Config {
    Config {
        database_url: "sqlite::memory:".into(),
        elo: EloConfig::default(),
        credential_check_floor: CHECK_FLOOR,
        reserved_id_threshold: RESERVED_ID_THRESHOLD,
    }
}

pub async fn setup() -> (SqlitePool, Services) {
    let config = config();
    let pool = db::connect(&config.database_url, 1).await.unwrap();
    run_migrations(&pool, config.reserved_id_threshold)
        .await
        .unwrap();
    let services = Services::with_hash_params(pool.clone(), &config, TEST_HASH).unwrap();
    (pool, services)
}

/// Same as [`setup`] but on a WAL database file with `max_connections`
/// pooled connections, so transactions from different tasks really overlap.
/// Keep the returned directory alive for the duration of the test.
pub async fn setup_file_backed(max_connections: u32) -> (TempDir, SqlitePool, Services) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config();
    config.database_url = format!("sqlite://{}", dir.path().join("skillgate.db").display());

    let pool = db::connect(&config.database_url, max_connections)
        .await
        .unwrap();
    run_migrations(&pool, config.reserved_id_threshold)
        .await
        .unwrap();
    let services = Services::with_hash_params(pool.clone(), &config, TEST_HASH).unwrap();
    (dir, pool, services)
}

/// Creates an account named `handle` and returns its internal and public IDs.
pub async fn account(services: &Services, handle: &str) -> (i64, String) {
    services
        .credentials
        .create_account(handle, &format!("{handle}@example.com"), "hunter22")
        .await
        .unwrap();
    services
        .credentials
        .account_identifiers(handle)
        .await
        .unwrap()
}

pub async fn set_rating(pool: &SqlitePool, id: i64, rating: i32) {
    sqlx::query("UPDATE profiles SET rating = ? WHERE id = ?")
        .bind(rating)
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}
