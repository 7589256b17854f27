use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::jwt::TokenError;
use crate::auth::store::StoreError;

/// Every business-rule failure the auth surface can produce. Handlers return
/// this and nothing else; the `IntoResponse` impl is the only place errors
/// are mapped to the wire.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Password too short. Minimum 8 characters required.")]
    PasswordTooShort,
    #[error("Password too long. Maximum 72 characters allowed.")]
    PasswordTooLong,
    #[error("Email already registered")]
    EmailTaken,
    // One message for unknown email and wrong password: login must not
    // reveal whether an account exists.
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("Could not validate credentials")]
    InvalidToken,
    #[error("User no longer exists")]
    UserNotFound,
    #[error("malformed password hash in store")]
    InvalidHashFormat,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidEmail
            | AuthError::PasswordTooShort
            | AuthError::PasswordTooLong
            | AuthError::EmailTaken => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::UserNotFound => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::InvalidHashFormat | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists => AuthError::EmailTaken,
            StoreError::Backend(msg) => AuthError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(_: TokenError) -> Self {
        AuthError::InvalidToken
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "internal error in auth handler");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "detail": detail }));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
