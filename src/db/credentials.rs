use std::time::Duration;

use sqlx::SqlitePool;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::{Account, Privilege, Session};
use crate::config::DEFAULT_CREDENTIAL_CHECK_FLOOR;
use crate::crypto::{PasswordVault, TokenIssuer, TokenKind};
use crate::elo::EloConfig;
use crate::error::{AppError, UniqueField};

const ACCOUNT_COLUMNS: &str = "id, public_id, handle, email, privilege, banned";

/// Account records, password checks and per-kind token slots.
#[derive(Clone, Debug)]
pub struct CredentialStore {
    pool: SqlitePool,
    vault: PasswordVault,
    issuer: TokenIssuer,
    check_floor: Duration,
    default_rating: i32,
}

impl CredentialStore {
    pub fn new(pool: SqlitePool, vault: PasswordVault) -> Self {
        Self {
            pool,
            vault,
            issuer: TokenIssuer,
            check_floor: DEFAULT_CREDENTIAL_CHECK_FLOOR,
            default_rating: EloConfig::default().default_rating,
        }
    }

    /// Minimum wall-clock duration of [`verify_credentials`](Self::verify_credentials).
    pub fn with_check_floor(mut self, floor: Duration) -> Self {
        self.check_floor = floor;
        self
    }

    /// Rating given to the profile of every new account.
    pub fn with_default_rating(mut self, rating: i32) -> Self {
        self.default_rating = rating;
        self
    }

    // === Account operations ===

    pub async fn account_exists(&self, handle: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, i32>("SELECT 1 FROM accounts WHERE handle = ?")
            .bind(handle)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::storage("check handle"))?;
        Ok(exists.is_some())
    }

    /// Creates the account, its profile and its email confirmation token as one
    /// unit of work, and returns the confirmation token.
    ///
    /// Sending the confirmation email is left to the caller, after this returns.
    #[instrument(skip(self, email, password))]
    pub async fn create_account(
        &self,
        handle: &str,
        email: &str,
        password: &str,
    ) -> Result<String, AppError> {
        if self.account_exists(handle).await? {
            debug!("handle already taken");
            return Err(AppError::AlreadyExists(UniqueField::Handle));
        }

        let salted_hash = self.vault.hash_blocking(password.to_owned()).await?;
        let public_id = Uuid::now_v7().to_string();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(AppError::storage("create account"))?;

        // The unique constraints settle races the pre-check could not see.
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO accounts (public_id, handle, email, salted_hash) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&public_id)
        .bind(handle)
        .bind(email)
        .bind(&salted_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify_account_insert)?;

        sqlx::query("INSERT INTO profiles (id, rating) VALUES (?, ?)")
            .bind(id)
            .bind(self.default_rating)
            .execute(&mut *tx)
            .await
            .map_err(AppError::storage("create profile"))?;

        // Dropping `tx` on any error below rolls the account back as well.
        let kind = TokenKind::EmailConfirmation;
        let token = self.issuer.mint(kind)?;

        sqlx::query(&format!(
            "INSERT INTO tokens (id, {value}, {expiry}) VALUES (?, ?, unixepoch() + ? * 3600)",
            value = kind.as_str(),
            expiry = kind.expiry_column(),
        ))
        .bind(id)
        .bind(&token)
        .bind(kind.lifetime_hours())
        .execute(&mut *tx)
        .await
        .map_err(AppError::storage("create token row"))?;

        tx.commit()
            .await
            .map_err(AppError::storage("create account"))?;

        info!(id, public_id = %public_id, "👤 account created");
        Ok(token)
    }

    /// Inserts an administrative account under an explicit internal ID.
    /// Seeded accounts use IDs below the ranking threshold and never appear on leaderboards.
    #[instrument(skip(self, email, password))]
    pub async fn seed_account(
        &self,
        id: i64,
        handle: &str,
        email: &str,
        password: &str,
        privilege: Privilege,
    ) -> Result<(), AppError> {
        let salted_hash = self.vault.hash_blocking(password.to_owned()).await?;
        let public_id = Uuid::now_v7().to_string();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(AppError::storage("seed account"))?;

        sqlx::query(
            "INSERT INTO accounts (id, public_id, handle, email, salted_hash, privilege) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&public_id)
        .bind(handle)
        .bind(email)
        .bind(&salted_hash)
        .bind(privilege)
        .execute(&mut *tx)
        .await
        .map_err(classify_account_insert)?;

        sqlx::query("INSERT INTO profiles (id, rating) VALUES (?, ?)")
            .bind(id)
            .bind(self.default_rating)
            .execute(&mut *tx)
            .await
            .map_err(AppError::storage("seed profile"))?;

        sqlx::query("INSERT INTO tokens (id) VALUES (?)")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::storage("seed token row"))?;

        tx.commit().await.map_err(AppError::storage("seed account"))?;

        info!(id, ?privilege, "👤 administrative account seeded");
        Ok(())
    }

    pub async fn account(&self, handle: &str) -> Result<Account, AppError> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE handle = ?"
        ))
        .bind(handle)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::storage("load account"))?
        .ok_or_else(|| AppError::not_found("account", handle))
    }

    /// Internal and public ID of the account owning `handle`.
    pub async fn account_identifiers(&self, handle: &str) -> Result<(i64, String), AppError> {
        sqlx::query_as::<_, (i64, String)>("SELECT id, public_id FROM accounts WHERE handle = ?")
            .bind(handle)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::storage("load account identifiers"))?
            .ok_or_else(|| AppError::not_found("account", handle))
    }

    pub async fn internal_id(&self, public_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM accounts WHERE public_id = ?")
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::storage("resolve public id"))?
            .ok_or_else(|| AppError::not_found("account", public_id))
    }

    pub async fn set_banned(&self, handle: &str, banned: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE accounts SET banned = ? WHERE handle = ?")
            .bind(banned)
            .bind(handle)
            .execute(&self.pool)
            .await
            .map_err(AppError::storage("set ban flag"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("account", handle));
        }
        warn!(handle, banned, "🔨 ban flag changed");
        Ok(())
    }

    pub async fn set_privilege(&self, handle: &str, privilege: Privilege) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE accounts SET privilege = ? WHERE handle = ?")
            .bind(privilege)
            .bind(handle)
            .execute(&self.pool)
            .await
            .map_err(AppError::storage("set privilege"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("account", handle));
        }
        info!(handle, ?privilege, "🔑 privilege changed");
        Ok(())
    }

    // === Credential checks ===

    /// Checks a handle/password pair.
    ///
    /// Always takes at least the configured floor, whatever the outcome, so the
    /// duration does not reveal whether the handle exists.
    pub async fn verify_credentials(&self, handle: &str, password: &str) -> Result<(), AppError> {
        let started = Instant::now();
        let outcome = self.check_credentials(handle, password).await;
        pad_to_floor(started, self.check_floor).await;

        match &outcome {
            Ok(()) => debug!(handle, "🔐 credentials accepted"),
            Err(AppError::NotFound { .. }) => debug!(handle, "🔐 unknown handle"),
            Err(AppError::CredentialMismatch) => debug!(handle, "🔐 wrong password"),
            Err(AppError::Banned) => warn!(handle, "🔐 banned account tried to sign in"),
            Err(e) => warn!(handle, error = %e, "🔐 credential check failed"),
        }
        outcome
    }

    async fn check_credentials(&self, handle: &str, password: &str) -> Result<(), AppError> {
        let (salted_hash, banned) = sqlx::query_as::<_, (String, bool)>(
            "SELECT salted_hash, banned FROM accounts WHERE handle = ?",
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::storage("load credentials"))?
        .ok_or_else(|| AppError::not_found("account", handle))?;

        if banned {
            return Err(AppError::Banned);
        }

        if self
            .vault
            .verify_blocking(password.to_owned(), salted_hash)
            .await?
        {
            Ok(())
        } else {
            Err(AppError::CredentialMismatch)
        }
    }

    /// Whether the account's privilege is at least `minimum`.
    pub async fn check_privilege(
        &self,
        handle: &str,
        minimum: Privilege,
    ) -> Result<bool, AppError> {
        let privilege =
            sqlx::query_scalar::<_, Privilege>("SELECT privilege FROM accounts WHERE handle = ?")
                .bind(handle)
                .fetch_optional(&self.pool)
                .await
                .map_err(AppError::storage("load privilege"))?
                .ok_or_else(|| AppError::not_found("account", handle))?;
        Ok(privilege >= minimum)
    }

    /// Verifies credentials, then requires `minimum` privilege.
    pub async fn authorize(
        &self,
        handle: &str,
        password: &str,
        minimum: Privilege,
    ) -> Result<(), AppError> {
        self.verify_credentials(handle, password).await?;
        if self.check_privilege(handle, minimum).await? {
            Ok(())
        } else {
            warn!(handle, ?minimum, "🔑 insufficient privilege");
            Err(AppError::InsufficientPrivilege)
        }
    }

    /// Verifies credentials and issues fresh auth and refresh tokens.
    pub async fn sign_in(&self, handle: &str, password: &str) -> Result<Session, AppError> {
        self.verify_credentials(handle, password).await?;
        let (id, public_id) = self.account_identifiers(handle).await?;

        let auth_token = self.issuer.mint(TokenKind::Auth)?;
        self.set_token(id, TokenKind::Auth, &auth_token, TokenKind::Auth.lifetime_hours())
            .await?;

        let refresh_token = self.issuer.mint(TokenKind::Refresh)?;
        self.set_token(
            id,
            TokenKind::Refresh,
            &refresh_token,
            TokenKind::Refresh.lifetime_hours(),
        )
        .await?;

        info!(id, "🔐 session issued");
        Ok(Session {
            public_id,
            auth_token,
            refresh_token,
        })
    }

    // === Token operations ===

    /// Overwrites the account's `kind` slot. Expiry is computed on the database clock.
    pub async fn set_token(
        &self,
        id: i64,
        kind: TokenKind,
        token: &str,
        lifetime_hours: u32,
    ) -> Result<(), AppError> {
        sqlx::query(&format!(
            r#"
            INSERT INTO tokens (id, {value}, {expiry})
            VALUES (?, ?, unixepoch() + ? * 3600)
            ON CONFLICT(id) DO UPDATE SET
                {value} = excluded.{value},
                {expiry} = excluded.{expiry}
            "#,
            value = kind.as_str(),
            expiry = kind.expiry_column(),
        ))
        .bind(id)
        .bind(token)
        .bind(lifetime_hours)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let unknown_account = e
                .as_database_error()
                .is_some_and(|db| db.is_foreign_key_violation());
            if unknown_account {
                AppError::not_found("account", id.to_string())
            } else {
                AppError::storage("set token")(e)
            }
        })?;

        debug!(id, %kind, lifetime_hours, "🎟️ token stored");
        Ok(())
    }

    /// The live `kind` token of an account. Expired values count as absent.
    pub async fn live_token(&self, id: i64, kind: TokenKind) -> Result<Option<String>, AppError> {
        let token = sqlx::query_scalar::<_, Option<String>>(&format!(
            "SELECT {value} FROM tokens WHERE id = ? AND {expiry} > unixepoch()",
            value = kind.as_str(),
            expiry = kind.expiry_column(),
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::storage("load token"))?;
        Ok(token.flatten())
    }

    /// Accepts `candidate` only if it equals the account's live `kind` token.
    pub async fn check_token(
        &self,
        public_id: &str,
        kind: TokenKind,
        candidate: &str,
    ) -> Result<(), AppError> {
        let stored = sqlx::query_scalar::<_, Option<String>>(&format!(
            r#"
            SELECT t.{value}
            FROM accounts a
            LEFT JOIN tokens t ON t.id = a.id AND t.{expiry} > unixepoch()
            WHERE a.public_id = ?
            "#,
            value = kind.as_str(),
            expiry = kind.expiry_column(),
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::storage("check token"))?
        .ok_or_else(|| AppError::not_found("account", public_id))?;

        match stored {
            Some(token) if constant_time_eq(token.as_bytes(), candidate.as_bytes()) => Ok(()),
            _ => {
                debug!(public_id, %kind, "🎟️ token rejected");
                Err(AppError::TokenRejected)
            }
        }
    }
}

/// Sleeps until `floor` has elapsed since `started`. No-op once past it.
pub(crate) async fn pad_to_floor(started: Instant, floor: Duration) {
    if let Some(remaining) = floor.checked_sub(started.elapsed()) {
        tokio::time::sleep(remaining).await;
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn classify_account_insert(err: sqlx::Error) -> AppError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            let message = db.message();
            for (column, field) in [
                ("accounts.handle", UniqueField::Handle),
                ("accounts.email", UniqueField::Email),
                ("accounts.public_id", UniqueField::PublicId),
            ] {
                if message.contains(column) {
                    return AppError::AlreadyExists(field);
                }
            }
        }
    }
    AppError::storage("insert account")(err)
}
