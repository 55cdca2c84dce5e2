//! Password hashing and random token issuance.

pub mod password;
pub mod token;

pub use password::{HashParams, PasswordVault};
pub use token::{TokenIssuer, TokenKind};
