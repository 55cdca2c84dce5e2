use sqlx::SqlitePool;

use crate::config::Config;
use crate::crypto::{HashParams, PasswordVault};
use crate::db::{CredentialStore, ProfileStore, RankEngine, RatingLedger};
use crate::elo::EloCalculator;
use crate::error::AppError;

/// Every component wired to one pool and one configuration.
#[derive(Clone, Debug)]
pub struct Services {
    pub credentials: CredentialStore,
    pub ledger: RatingLedger,
    pub ranking: RankEngine,
    pub profiles: ProfileStore,
}

impl Services {
    pub fn new(pool: SqlitePool, config: &Config) -> Result<Self, AppError> {
        Self::with_hash_params(pool, config, HashParams::INTERACTIVE)
    }

    pub fn with_hash_params(
        pool: SqlitePool,
        config: &Config,
        params: HashParams,
    ) -> Result<Self, AppError> {
        let vault = PasswordVault::new(params)?;

        Ok(Self {
            credentials: CredentialStore::new(pool.clone(), vault)
                .with_check_floor(config.credential_check_floor)
                .with_default_rating(config.elo.default_rating),
            ledger: RatingLedger::new(pool.clone(), EloCalculator::new(config.elo)),
            ranking: RankEngine::new(pool.clone())
                .with_reserved_id_threshold(config.reserved_id_threshold),
            profiles: ProfileStore::new(pool),
        })
    }
}
