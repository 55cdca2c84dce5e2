use std::fmt;

use thiserror::Error;

/// Column whose unique constraint rejected an account insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Handle,
    Email,
    PublicId,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UniqueField::Handle => "handle",
            UniqueField::Email => "email",
            UniqueField::PublicId => "public id",
        })
    }
}

/// Participant of a match, used to say which side of a rating update failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Player1,
    Player2,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Player1 => "player 1",
            Side::Player2 => "player 2",
        })
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database error during {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("The {0} is already in use")]
    AlreadyExists(UniqueField),

    #[error("Account is banned")]
    Banned,

    #[error("The provided password does not match the stored password")]
    CredentialMismatch,

    #[error("Account does not have the required privilege")]
    InsufficientPrivilege,

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Rating update failed: {side} [ {id} ] not found")]
    PlayerNotFound { side: Side, id: i64 },

    #[error("Invalid match: {0}")]
    InvalidMatch(String),

    #[error("Token is missing, expired or does not match")]
    TokenRejected,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Wraps a storage failure with the logical operation it interrupted.
    pub fn storage(operation: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
        move |source| AppError::Storage { operation, source }
    }

    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        AppError::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Stable result code reported to callers. Raw storage text is not part of it.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(_) | AppError::Storage { .. } => ErrorCode::DatabaseError,
            AppError::Crypto(_) => ErrorCode::CryptoError,
            AppError::Config(_) => ErrorCode::ConfigError,
            AppError::AlreadyExists(UniqueField::Handle) => ErrorCode::HandleAlreadyInUse,
            AppError::AlreadyExists(UniqueField::Email) => ErrorCode::EmailAlreadyInUse,
            AppError::AlreadyExists(UniqueField::PublicId) => ErrorCode::DatabaseError,
            // Unknown handle and wrong password must be indistinguishable from outside.
            AppError::NotFound { .. } | AppError::CredentialMismatch => {
                ErrorCode::AuthUsernameOrPasswordIncorrect
            }
            AppError::Banned => ErrorCode::AuthBanned,
            AppError::InsufficientPrivilege => ErrorCode::AuthPrivilegeInsufficient,
            AppError::TokenRejected => ErrorCode::AuthTokenRejected,
            AppError::PlayerNotFound { side: Side::Player1, .. } => ErrorCode::Player1NotFound,
            AppError::PlayerNotFound { side: Side::Player2, .. } => ErrorCode::Player2NotFound,
            AppError::InvalidMatch(_) => ErrorCode::InvalidMatch,
        }
    }
}

/// Numeric result codes, grouped by area in blocks of one hundred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,

    DatabaseError = 102,
    CryptoError = 103,
    ConfigError = 105,

    HandleAlreadyInUse = 204,
    EmailAlreadyInUse = 302,

    AuthPrivilegeInsufficient = 502,
    AuthUsernameOrPasswordIncorrect = 503,
    AuthBanned = 504,
    AuthTokenRejected = 505,

    Player1NotFound = 603,
    Player2NotFound = 604,
    InvalidMatch = 605,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}
