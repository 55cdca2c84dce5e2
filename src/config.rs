use std::env;
use std::time::Duration;

use crate::elo::EloConfig;
use crate::error::AppError;

pub const DEFAULT_RESERVED_ID_THRESHOLD: i64 = 100;
pub const DEFAULT_CREDENTIAL_CHECK_FLOOR: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub elo: EloConfig,
    /// Minimum wall-clock duration of a credential check.
    pub credential_check_floor: Duration,
    /// Accounts with an internal ID below this value are administrative seeds.
    pub reserved_id_threshold: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let defaults = EloConfig::default();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:skillgate.db".into());

        let k = parse_var("ELO_K").unwrap_or(defaults.k);
        let spread = parse_var("ELO_SPREAD").unwrap_or(defaults.spread);
        let default_rating = parse_var("ELO_DEFAULT_RATING").unwrap_or(defaults.default_rating);

        let credential_check_floor = parse_var("CREDENTIAL_CHECK_FLOOR_MS")
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_CREDENTIAL_CHECK_FLOOR);

        let reserved_id_threshold =
            parse_var("RESERVED_ID_THRESHOLD").unwrap_or(DEFAULT_RESERVED_ID_THRESHOLD);

        Ok(Self {
            database_url,
            elo: EloConfig::new(k, spread, default_rating)?,
            credential_check_floor,
            reserved_id_threshold,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
