use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::error::AuthError;
use crate::auth::jwt::JwtKeys;

/// Extracts the Bearer token from the Authorization header and verifies it,
/// yielding the token's subject (the user's email). Lookup of the subject is
/// the handler's job.
pub struct AuthSubject(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthSubject
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::InvalidToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(AuthError::InvalidToken)?;

        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "token rejected");
            AuthError::from(e)
        })?;

        Ok(AuthSubject(claims.sub))
    }
}
