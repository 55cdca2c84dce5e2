use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, instrument};

use super::models::{MatchOutcome, MatchRecord, MatchResult, MatchStats};
use crate::elo::{EloCalculator, Winner};
use crate::error::{AppError, Side};

/// Applies match outcomes to both participants' rating and counters.
#[derive(Clone, Debug)]
pub struct RatingLedger {
    pool: SqlitePool,
    elo: EloCalculator,
}

impl RatingLedger {
    pub fn new(pool: SqlitePool, elo: EloCalculator) -> Self {
        Self { pool, elo }
    }

    /// Posts one match result as a single unit of work.
    ///
    /// Counters are bumped first: that takes the write lock and proves both
    /// players exist. Ratings are then read under the lock, so concurrent
    /// results for the same player serialize instead of overwriting each other.
    #[instrument(skip(self, outcome), fields(player1 = outcome.player1, player2 = outcome.player2, winner = ?outcome.winner))]
    pub async fn post_match_result(&self, outcome: &MatchOutcome) -> Result<MatchResult, AppError> {
        if outcome.player1 == outcome.player2 {
            return Err(AppError::InvalidMatch(format!(
                "player [ {} ] cannot play against themselves",
                outcome.player1
            )));
        }

        let (column1, column2) = counter_columns(outcome.winner);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(AppError::storage("post match result"))?;

        bump_counter(&mut tx, outcome.player1, column1, Side::Player1).await?;
        bump_counter(&mut tx, outcome.player2, column2, Side::Player2).await?;

        let rating1 = current_rating(&mut tx, outcome.player1, Side::Player1).await?;
        let rating2 = current_rating(&mut tx, outcome.player2, Side::Player2).await?;
        let (new1, new2) = self.elo.apply_outcome(rating1, rating2, outcome.winner);

        let player1 = store_rating(&mut tx, outcome.player1, new1, Side::Player1).await?;
        let player2 = store_rating(&mut tx, outcome.player2, new2, Side::Player2).await?;

        let winner_id = match outcome.winner {
            Winner::Player1 => Some(outcome.player1),
            Winner::Player2 => Some(outcome.player2),
            Winner::Draw => None,
        };

        sqlx::query("INSERT INTO matches (player1, player2, winner) VALUES (?, ?, ?)")
            .bind(outcome.player1)
            .bind(outcome.player2)
            .bind(winner_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::storage("record match"))?;

        tx.commit()
            .await
            .map_err(AppError::storage("post match result"))?;

        info!(
            rating1,
            rating2,
            new_rating1 = new1,
            new_rating2 = new2,
            "🏆 match result posted"
        );
        Ok(MatchResult { player1, player2 })
    }

    pub async fn match_stats(&self, id: i64) -> Result<MatchStats, AppError> {
        sqlx::query_as::<_, MatchStats>(
            "SELECT rating, wins, draws, losses FROM profiles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::storage("load match stats"))?
        .ok_or_else(|| AppError::not_found("player", id.to_string()))
    }

    /// Matches `id` took part in, newest first.
    pub async fn match_history(&self, id: i64) -> Result<Vec<MatchRecord>, AppError> {
        let history = sqlx::query_as::<_, MatchRecord>(
            r#"
            SELECT m.id,
                   p1.handle AS player1_handle,
                   p1.public_id AS player1_public_id,
                   p2.handle AS player2_handle,
                   p2.public_id AS player2_public_id,
                   w.public_id AS winner_public_id,
                   w.handle AS winner_handle,
                   m.ended_at
            FROM matches m
            INNER JOIN accounts p1 ON p1.id = m.player1
            INNER JOIN accounts p2 ON p2.id = m.player2
            LEFT JOIN accounts w ON w.id = m.winner
            WHERE ? IN (m.player1, m.player2)
            ORDER BY m.ended_at DESC, m.id DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::storage("load match history"))?;

        debug!(id, matches = history.len(), "📜 match history loaded");
        Ok(history)
    }
}

/// Counter incremented for player 1 and player 2 respectively.
fn counter_columns(winner: Winner) -> (&'static str, &'static str) {
    match winner {
        Winner::Player1 => ("wins", "losses"),
        Winner::Player2 => ("losses", "wins"),
        Winner::Draw => ("draws", "draws"),
    }
}

async fn bump_counter(
    conn: &mut SqliteConnection,
    id: i64,
    column: &'static str,
    side: Side,
) -> Result<(), AppError> {
    let result = sqlx::query(&format!(
        "UPDATE profiles SET {column} = {column} + 1 WHERE id = ?"
    ))
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(AppError::storage("update match counters"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::PlayerNotFound { side, id });
    }
    Ok(())
}

async fn current_rating(conn: &mut SqliteConnection, id: i64, side: Side) -> Result<i32, AppError> {
    sqlx::query_scalar::<_, i32>("SELECT rating FROM profiles WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::storage("load rating"))?
        .ok_or(AppError::PlayerNotFound { side, id })
}

async fn store_rating(
    conn: &mut SqliteConnection,
    id: i64,
    rating: i32,
    side: Side,
) -> Result<MatchStats, AppError> {
    sqlx::query_as::<_, MatchStats>(
        "UPDATE profiles SET rating = ? WHERE id = ? RETURNING rating, wins, draws, losses",
    )
    .bind(rating)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(AppError::storage("update rating"))?
    .ok_or(AppError::PlayerNotFound { side, id })
}
