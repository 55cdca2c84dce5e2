use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::models::{Leaderboard, RankedRow};
use crate::config::DEFAULT_RESERVED_ID_THRESHOLD;
use crate::error::AppError;

/// Largest window callers may request in one read.
pub const MAX_WINDOW: u32 = 100;

/// Every ranked account with its dense rank. Windows and single lookups both
/// select from this, so they always agree. Binds the reserved-ID threshold.
const RANKED: &str = r#"
WITH ranked AS (
    SELECT a.id,
           a.public_id,
           a.handle,
           p.avatar,
           p.rating,
           p.wins,
           p.draws,
           p.losses,
           COALESCE(p.win_ratio, 0.0) AS win_ratio,
           p.ranked_total,
           DENSE_RANK() OVER (
               ORDER BY p.rating DESC, COALESCE(p.win_ratio, 0.0) DESC
           ) AS rank
    FROM profiles p
    INNER JOIN accounts a ON a.id = p.id
    WHERE p.id >= ?
)
"#;

const RANKED_COLUMNS: &str =
    "public_id, handle, avatar, rating, wins, draws, losses, win_ratio, ranked_total, rank";

/// Leaderboard reads over all non-reserved accounts, ordered by rating then win ratio.
#[derive(Clone, Debug)]
pub struct RankEngine {
    pool: SqlitePool,
    reserved_id_threshold: i64,
}

impl RankEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            reserved_id_threshold: DEFAULT_RESERVED_ID_THRESHOLD,
        }
    }

    pub fn with_reserved_id_threshold(mut self, threshold: i64) -> Self {
        self.reserved_id_threshold = threshold;
        self
    }

    /// Number of ranked accounts.
    pub async fn leaderboard_size(&self) -> Result<i64, AppError> {
        let mut conn = self.acquire().await?;
        count_ranked(&mut conn, self.reserved_id_threshold).await
    }

    /// Up to `count` rows from 0-based offset `start`. Callers must keep
    /// `count` at or below [`MAX_WINDOW`]; it is not enforced here.
    pub async fn window(&self, start: u32, count: u32) -> Result<Vec<RankedRow>, AppError> {
        let mut conn = self.acquire().await?;
        ranked_window(&mut conn, self.reserved_id_threshold, start, count).await
    }

    /// The row of one account. `None` for unknown or reserved accounts.
    pub async fn account_rank(&self, public_id: &str) -> Result<Option<RankedRow>, AppError> {
        let mut conn = self.acquire().await?;
        ranked_account(&mut conn, self.reserved_id_threshold, public_id).await
    }

    /// Count, window and optional single lookup read from one snapshot.
    pub async fn leaderboard(
        &self,
        public_id: Option<&str>,
        start: u32,
        count: u32,
    ) -> Result<Leaderboard, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(AppError::storage("read leaderboard"))?;

        let out_of = count_ranked(&mut tx, self.reserved_id_threshold).await?;
        let user = match public_id {
            Some(public_id) => ranked_account(&mut tx, self.reserved_id_threshold, public_id).await?,
            None => None,
        };
        let rows = ranked_window(&mut tx, self.reserved_id_threshold, start, count).await?;

        tx.commit()
            .await
            .map_err(AppError::storage("read leaderboard"))?;

        debug!(out_of, start, rows = rows.len(), "📊 leaderboard read");
        Ok(Leaderboard { out_of, rows, user })
    }

    async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<sqlx::Sqlite>, AppError> {
        self.pool
            .acquire()
            .await
            .map_err(AppError::storage("acquire connection"))
    }
}

async fn count_ranked(conn: &mut SqliteConnection, threshold: i64) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles WHERE id >= ?")
        .bind(threshold)
        .fetch_one(&mut *conn)
        .await
        .map_err(AppError::storage("count leaderboard"))
}

async fn ranked_window(
    conn: &mut SqliteConnection,
    threshold: i64,
    start: u32,
    count: u32,
) -> Result<Vec<RankedRow>, AppError> {
    sqlx::query_as::<_, RankedRow>(&format!(
        "{RANKED} SELECT {RANKED_COLUMNS} FROM ranked ORDER BY rank, id LIMIT ? OFFSET ?"
    ))
    .bind(threshold)
    .bind(count)
    .bind(start)
    .fetch_all(&mut *conn)
    .await
    .map_err(AppError::storage("read leaderboard window"))
}

async fn ranked_account(
    conn: &mut SqliteConnection,
    threshold: i64,
    public_id: &str,
) -> Result<Option<RankedRow>, AppError> {
    sqlx::query_as::<_, RankedRow>(&format!(
        "{RANKED} SELECT {RANKED_COLUMNS} FROM ranked WHERE public_id = ?"
    ))
    .bind(threshold)
    .bind(public_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(AppError::storage("read account rank"))
}
