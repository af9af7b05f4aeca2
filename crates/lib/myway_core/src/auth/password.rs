//! Password hashing via bcrypt.

use super::AuthError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Minimum accepted password length at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

/// bcrypt only reads this many bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password with a fresh salt.
///
/// Input longer than [`MAX_PASSWORD_BYTES`] is refused rather than truncated.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::non_truncating_hash(password, BCRYPT_COST).map_err(|e| match e {
        bcrypt::BcryptError::Truncation(_) => AuthError::Validation(format!(
            "Password must be at most {MAX_PASSWORD_BYTES} bytes"
        )),
        other => AuthError::Internal(format!("bcrypt hash: {other}")),
    })
}

/// Verify a password against a stored hash.
///
/// A hash that bcrypt cannot parse counts as a mismatch, as does a password
/// too long to verify without truncation.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::non_truncating_verify(password, hash).unwrap_or(false)
}
