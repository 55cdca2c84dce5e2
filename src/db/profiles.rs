use sqlx::SqlitePool;
use tracing::info;

use super::models::Profile;
use crate::error::AppError;

/// Public profile reads keyed by public ID.
#[derive(Clone, Debug)]
pub struct ProfileStore {
    pool: SqlitePool,
}

impl ProfileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn profile(&self, public_id: &str) -> Result<Profile, AppError> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT a.handle,
                   p.avatar,
                   p.rating,
                   p.wins,
                   p.draws,
                   p.losses,
                   COALESCE(p.win_ratio, 0.0) AS win_ratio,
                   p.ranked_total,
                   p.created_at
            FROM profiles p
            INNER JOIN accounts a ON a.id = p.id
            WHERE a.public_id = ?
            "#,
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::storage("load profile"))?
        .ok_or_else(|| AppError::not_found("profile", public_id))
    }

    pub async fn set_avatar(&self, public_id: &str, avatar: u8) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE profiles SET avatar = ? WHERE id = (SELECT id FROM accounts WHERE public_id = ?)",
        )
        .bind(avatar)
        .bind(public_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::storage("update avatar"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("profile", public_id));
        }
        info!(public_id, avatar, "🖼️ avatar updated");
        Ok(())
    }
}
