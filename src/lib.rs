//! Account security and competitive rating core for a multiplayer game backend.
//!
//! - [`db::CredentialStore`]: accounts, password checks, credential tokens
//! - [`db::RatingLedger`]: atomic two-player Elo updates
//! - [`db::RankEngine`]: dense-ranked leaderboard reads
//! - [`elo::EloCalculator`]: pure rating maths

pub mod config;
pub mod crypto;
pub mod db;
pub mod elo;
pub mod error;
pub mod logging;
pub mod services;

pub use config::Config;
pub use error::{AppError, ErrorCode};
pub use services::Services;
