use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest, TokenResponse},
        error::AuthError,
        extractors::AuthSubject,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        store::normalize_email,
    },
    state::AppState,
};

const MIN_PASSWORD_CHARS: usize = 8;
const MAX_PASSWORD_CHARS: usize = 72;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AuthError> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(email = %email, "register rejected: invalid email");
        return Err(AuthError::InvalidEmail);
    }
    let password_chars = payload.password.chars().count();
    if password_chars < MIN_PASSWORD_CHARS {
        warn!("register rejected: password too short");
        return Err(AuthError::PasswordTooShort);
    }
    if password_chars > MAX_PASSWORD_CHARS {
        warn!("register rejected: password too long");
        return Err(AuthError::PasswordTooLong);
    }

    // hash_password also enforces bcrypt's 72-byte input cap.
    let hash = hash_password(&payload.password)?;

    // The store decides uniqueness; check-and-insert is atomic there.
    let user = state
        .store
        .create(&email, &hash, payload.full_name)
        .await
        .map_err(|e| {
            warn!(email = %email, error = %e, "register rejected by store");
            AuthError::from(e)
        })?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let email = normalize_email(&payload.email);

    // Unknown email and wrong password take the same exit. The response must
    // not distinguish them.
    let user = match state.store.find_by_email(&email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %email, user_id = user.id, "login failed: wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(&user.email)?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(Json(TokenResponse::bearer(token)))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthSubject(email): AuthSubject,
) -> Result<Json<PublicUser>, AuthError> {
    let user = state
        .store
        .find_by_email(&email)
        .await?
        .ok_or_else(|| {
            // Token was valid but the subject is gone, e.g. store reset.
            warn!(email = %email, "token subject no longer resolves");
            AuthError::UserNotFound
        })?;

    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
    }

    #[test]
    fn email_regex_rejects_obvious_garbage() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("two@@x.com"));
        assert!(!is_valid_email("spaces in@x.com"));
        assert!(!is_valid_email(""));
    }
}
