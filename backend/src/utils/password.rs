//! Password hashing and verification.
//!
//! Thin wrapper over bcrypt with a configurable cost factor. Verification
//! distinguishes a malformed stored hash from a plain mismatch so the
//! condition can be logged, but callers making authentication decisions
//! must treat the two identically.

use bcrypt::BcryptError;
use tracing::warn;

use crate::errors::AuthError;

/// Outcome of comparing a password against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Match,
    Mismatch,
    /// The stored hash is not a well-formed bcrypt string. Surfaced for
    /// telemetry only; authentication treats this as a mismatch.
    MalformedHash,
}

impl VerifyOutcome {
    pub fn is_match(self) -> bool {
        matches!(self, VerifyOutcome::Match)
    }
}

/// Hashes a password with bcrypt at the given cost.
///
/// Any string is valid input, including the empty string. Failure means
/// the underlying RNG or allocator gave out, not that the input was bad.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| {
        warn!(kind = %bcrypt_error_kind(&e), "password hashing failed");
        AuthError::Hashing
    })
}

/// Compares a password against a stored bcrypt hash.
///
/// Never fails: an unparseable hash yields `MalformedHash` instead of an
/// error, so a corrupted row cannot take down a login request.
pub fn verify_password(password: &str, hash: &str) -> VerifyOutcome {
    match bcrypt::verify(password, hash) {
        Ok(true) => VerifyOutcome::Match,
        Ok(false) => VerifyOutcome::Mismatch,
        Err(_) => VerifyOutcome::MalformedHash,
    }
}

fn bcrypt_error_kind(error: &BcryptError) -> &'static str {
    match error {
        BcryptError::Io(_) => "io",
        BcryptError::CostNotAllowed(_) => "cost_not_allowed",
        BcryptError::InvalidCost(_) => "invalid_cost",
        BcryptError::InvalidPrefix(_) => "invalid_prefix",
        BcryptError::InvalidHash(_) => "invalid_hash",
        BcryptError::InvalidSaltLen(_) => "invalid_salt_len",
        BcryptError::InvalidBase64(_) => "invalid_base64",
        BcryptError::Rand(_) => "rand",
        BcryptError::Truncation(_) => "truncation",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum bcrypt cost; keeps the tests fast.
    const COST: u32 = 4;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("correct horse battery staple", COST).unwrap();
        assert_eq!(
            verify_password("correct horse battery staple", &hash),
            VerifyOutcome::Match
        );
        assert_eq!(
            verify_password("wrong password", &hash),
            VerifyOutcome::Mismatch
        );
    }

    #[test]
    fn empty_password_is_valid_input() {
        let hash = hash_password("", COST).unwrap();
        assert_eq!(verify_password("", &hash), VerifyOutcome::Match);
        assert_eq!(verify_password("x", &hash), VerifyOutcome::Mismatch);
    }

    #[test]
    fn unicode_password_round_trips() {
        let hash = hash_password("pässwörd-日本語-🔑", COST).unwrap();
        assert_eq!(
            verify_password("pässwörd-日本語-🔑", &hash),
            VerifyOutcome::Match
        );
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("pw", COST).unwrap();
        let b = hash_password("pw", COST).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_distinguishable_but_not_a_match() {
        let outcome = verify_password("pw", "not-a-bcrypt-hash");
        assert_eq!(outcome, VerifyOutcome::MalformedHash);
        assert!(!outcome.is_match());
    }
}
