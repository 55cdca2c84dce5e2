use sqlx::SqlitePool;
use tracing::info;

use crate::error::AppError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    public_id TEXT UNIQUE NOT NULL,
    handle TEXT UNIQUE NOT NULL COLLATE NOCASE,
    email TEXT UNIQUE NOT NULL COLLATE NOCASE,
    salted_hash TEXT NOT NULL,
    privilege INTEGER NOT NULL DEFAULT 0,
    banned INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT (unixepoch())
);

CREATE TABLE IF NOT EXISTS tokens (
    id INTEGER PRIMARY KEY,
    auth TEXT,
    auth_expiry INTEGER,
    email_confirmation TEXT,
    email_confirmation_expiry INTEGER,
    password_reset TEXT,
    password_reset_expiry INTEGER,
    refresh TEXT,
    refresh_expiry INTEGER,
    FOREIGN KEY (id) REFERENCES accounts(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS profiles (
    id INTEGER PRIMARY KEY,
    avatar INTEGER NOT NULL DEFAULT 0,
    rating INTEGER NOT NULL,
    wins INTEGER NOT NULL DEFAULT 0 CHECK (wins >= 0),
    draws INTEGER NOT NULL DEFAULT 0 CHECK (draws >= 0),
    losses INTEGER NOT NULL DEFAULT 0 CHECK (losses >= 0),
    ranked_total INTEGER GENERATED ALWAYS AS (wins + draws + losses) VIRTUAL,
    win_ratio REAL GENERATED ALWAYS AS (CAST(wins AS REAL) / NULLIF(wins + draws + losses, 0)) VIRTUAL,
    created_at INTEGER NOT NULL DEFAULT (unixepoch()),
    FOREIGN KEY (id) REFERENCES accounts(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS matches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    player1 INTEGER NOT NULL,
    player2 INTEGER NOT NULL,
    winner INTEGER,
    ended_at INTEGER NOT NULL DEFAULT (unixepoch()),
    FOREIGN KEY (player1) REFERENCES accounts(id) ON DELETE CASCADE,
    FOREIGN KEY (player2) REFERENCES accounts(id) ON DELETE CASCADE,
    FOREIGN KEY (winner) REFERENCES accounts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_profiles_rating ON profiles(rating DESC);
CREATE INDEX IF NOT EXISTS idx_matches_player1 ON matches(player1);
CREATE INDEX IF NOT EXISTS idx_matches_player2 ON matches(player2);
"#;

/// Creates the schema and moves the account ID sequence past the reserved range,
/// so ordinary sign-ups never receive an administrative ID.
pub async fn run_migrations(pool: &SqlitePool, reserved_id_threshold: i64) -> Result<(), AppError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(AppError::storage("create schema"))?;

    let floor = (reserved_id_threshold - 1).max(0);

    sqlx::query(
        "INSERT INTO sqlite_sequence (name, seq)
         SELECT 'accounts', ?
         WHERE NOT EXISTS (SELECT 1 FROM sqlite_sequence WHERE name = 'accounts')",
    )
    .bind(floor)
    .execute(pool)
    .await
    .map_err(AppError::storage("reserve account ids"))?;

    sqlx::query("UPDATE sqlite_sequence SET seq = ? WHERE name = 'accounts' AND seq < ?")
        .bind(floor)
        .bind(floor)
        .execute(pool)
        .await
        .map_err(AppError::storage("reserve account ids"))?;

    info!(reserved_id_threshold, "🗄️ Database migrations completed");
    Ok(())
}
