use std::fmt;

use rand::TryRngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Largest multiple of 62 that fits in a byte. Bytes at or above it are redrawn.
const ACCEPT_BELOW: u8 = 248;

/// Purpose of a credential token. Each account holds at most one live value per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Auth,
    EmailConfirmation,
    PasswordReset,
    Refresh,
}

impl TokenKind {
    pub const ALL: [TokenKind; 4] = [
        TokenKind::Auth,
        TokenKind::EmailConfirmation,
        TokenKind::PasswordReset,
        TokenKind::Refresh,
    ];

    /// Fixed external identifier, also the token value column name.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Auth => "auth",
            TokenKind::EmailConfirmation => "email_confirmation",
            TokenKind::PasswordReset => "password_reset",
            TokenKind::Refresh => "refresh",
        }
    }

    pub fn expiry_column(self) -> &'static str {
        match self {
            TokenKind::Auth => "auth_expiry",
            TokenKind::EmailConfirmation => "email_confirmation_expiry",
            TokenKind::PasswordReset => "password_reset_expiry",
            TokenKind::Refresh => "refresh_expiry",
        }
    }

    pub fn lifetime_hours(self) -> u32 {
        match self {
            TokenKind::Auth => 1,
            TokenKind::EmailConfirmation => 48,
            TokenKind::PasswordReset => 1,
            TokenKind::Refresh => 12,
        }
    }

    pub fn length(self) -> usize {
        32
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Draws alphanumeric tokens from the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenIssuer;

impl TokenIssuer {
    /// A fresh value of the length `kind` prescribes.
    pub fn mint(&self, kind: TokenKind) -> Result<String, AppError> {
        self.generate(kind.length())
    }

    pub fn generate(&self, length: usize) -> Result<String, AppError> {
        generate_with(&mut OsRng, length)
    }
}

/// Exactly `length` characters from `[0-9A-Za-z]`, without modulo bias.
///
/// Retries until enough bytes are accepted; only an entropy source failure
/// stops it early.
pub fn generate_with<R>(rng: &mut R, length: usize) -> Result<String, AppError>
where
    R: TryRngCore + ?Sized,
{
    let mut token = String::with_capacity(length);
    let mut buf = [0u8; 64];

    while token.len() < length {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| AppError::Crypto(format!("entropy source failed: {e}")))?;

        let remaining = length - token.len();
        token.extend(
            buf.iter()
                .filter(|&&b| b < ACCEPT_BELOW)
                .take(remaining)
                .map(|&b| char::from(ALPHABET[usize::from(b % 62)])),
        );
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use std::io;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    struct BrokenSource;

    impl TryRngCore for BrokenSource {
        type Error = io::Error;

        fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
            Err(io::Error::other("no entropy"))
        }

        fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
            Err(io::Error::other("no entropy"))
        }

        fn try_fill_bytes(&mut self, _dst: &mut [u8]) -> Result<(), Self::Error> {
            Err(io::Error::other("no entropy"))
        }
    }

    /// Yields only bytes that must be rejected, then a single usable run.
    struct MostlyRejected {
        calls: usize,
    }

    impl TryRngCore for MostlyRejected {
        type Error = io::Error;

        fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
            unreachable!()
        }

        fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
            unreachable!()
        }

        fn try_fill_bytes(&mut self, dst: &mut [u8]) -> Result<(), Self::Error> {
            self.calls += 1;
            let byte = if self.calls < 4 { 250 } else { 61 };
            dst.fill(byte);
            Ok(())
        }
    }

    fn is_alphanumeric(token: &str) -> bool {
        token.bytes().all(|b| b.is_ascii_alphanumeric())
    }

    #[test]
    fn generated_tokens_have_exact_length_and_alphabet() {
        let issuer = TokenIssuer;
        for length in [0, 1, 31, 32, 63, 64, 65, 200] {
            let token = issuer.generate(length).unwrap();
            assert_eq!(token.len(), length);
            assert!(is_alphanumeric(&token), "{token}");
        }
    }

    #[test]
    fn seeded_generation_covers_the_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        let token = generate_with(&mut rng, 10_000).unwrap();
        for &c in ALPHABET {
            assert!(token.as_bytes().contains(&c), "missing {}", c as char);
        }
    }

    #[test]
    fn rejected_bytes_are_redrawn() {
        let mut source = MostlyRejected { calls: 0 };
        let token = generate_with(&mut source, 5).unwrap();
        assert_eq!(token, "zzzzz");
        assert_eq!(source.calls, 4);
    }

    #[test]
    fn entropy_failure_is_a_crypto_error() {
        let err = generate_with(&mut BrokenSource, 8).unwrap_err();
        assert!(matches!(err, AppError::Crypto(_)));
    }

    #[test]
    fn kinds_map_to_fixed_identifiers() {
        let names: Vec<_> = TokenKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, ["auth", "email_confirmation", "password_reset", "refresh"]);
        for kind in TokenKind::ALL {
            assert_eq!(kind.expiry_column(), format!("{kind}_expiry"));
        }
        assert_eq!(TokenIssuer.mint(TokenKind::Refresh).unwrap().len(), 32);
    }
}
