use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::elo::Winner;

/// Ordered privilege levels: `User < GameAdmin < ServerAdmin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    User = 0,
    GameAdmin = 1,
    ServerAdmin = 2,
}

#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub public_id: String,
    pub handle: String,
    pub email: String,
    pub privilege: Privilege,
    pub banned: bool,
}

/// Per-account rating and result counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize)]
pub struct MatchStats {
    pub rating: i32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

/// A finished match, consumed once by the rating ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MatchOutcome {
    pub player1: i64,
    pub player2: i64,
    pub winner: Winner,
}

/// Stats of both participants after a posted result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub player1: MatchStats,
    pub player2: MatchStats,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Profile {
    pub handle: String,
    pub avatar: u8,
    pub rating: i32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub win_ratio: f64,
    pub ranked_total: i64,
    pub created_at: i64,
}

/// One leaderboard row. `rank` is 1-based and dense over all ranked accounts.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct RankedRow {
    pub public_id: String,
    pub handle: String,
    pub avatar: u8,
    pub rating: i32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub win_ratio: f64,
    pub ranked_total: i64,
    pub rank: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    /// Number of ranked accounts.
    pub out_of: i64,
    pub rows: Vec<RankedRow>,
    pub user: Option<RankedRow>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MatchRecord {
    pub id: i64,
    pub player1_handle: String,
    pub player1_public_id: String,
    pub player2_handle: String,
    pub player2_public_id: String,
    /// `None` for a draw, as is `winner_handle`.
    pub winner_public_id: Option<String>,
    pub winner_handle: Option<String>,
    pub ended_at: i64,
}

/// Tokens handed out on a successful sign-in.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub public_id: String,
    pub auth_token: String,
    pub refresh_token: String,
}
