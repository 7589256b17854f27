use bcrypt::{hash, verify, DEFAULT_COST};
use tracing::error;

use crate::auth::error::AuthError;

/// bcrypt reads at most 72 bytes of input; longer passwords must be rejected
/// rather than silently truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    if plain.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::PasswordTooLong);
    }
    hash(plain, DEFAULT_COST).map_err(|e| {
        error!(error = %e, "bcrypt hash error");
        AuthError::Internal(e.into())
    })
}

pub fn verify_password(plain: &str, hashed: &str) -> Result<bool, AuthError> {
    verify(plain, hashed).map_err(|e| {
        error!(error = %e, "bcrypt parse hash error");
        AuthError::InvalidHashFormat
    })
}
