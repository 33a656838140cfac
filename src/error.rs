//! # Error Types
//!
//! Error taxonomy for the authentication core and its mapping onto HTTP
//! responses. Store, signing and hashing failures keep their specific cause
//! for the logs but only ever reach the client as a generic message.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::auth::jwt::TokenError;

/// Generic message for failures the client cannot act on.
pub const GENERIC_FAILURE: &str = "Something bad happened";

/// Message shared by every bad-credentials rejection.
pub const INVALID_CREDENTIALS: &str = "Invalid email or Password";

/// Errors raised by the credential store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-email constraint violated.
    #[error("account with this email already exists")]
    Conflict,

    #[error("store call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("failed to get connection from pool: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// Row could not be mapped onto the typed account model.
    #[error("malformed account row: {0}")]
    Row(String),
}

/// Errors surfaced by the session flows.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed input, rejected before any side effect.
    #[error("{0}")]
    Validation(String),

    #[error("User with that email already exists")]
    Conflict,

    /// Bad credentials. Deliberately carries no detail.
    #[error("{}", INVALID_CREDENTIALS)]
    InvalidCredentials,

    /// No usable session on a protected route.
    #[error("{0}")]
    Unauthorized(String),

    /// Missing, invalid or orphaned token on refresh/protected calls.
    #[error("{0}")]
    Forbidden(String),

    #[error("store failure: {0}")]
    Store(StoreError),

    #[error("signing failure: {0}")]
    Signing(TokenError),

    #[error("password hashing failure: {0}")]
    Hash(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => AuthError::Conflict,
            other => AuthError::Store(other),
        }
    }
}

/// Unreadable request bodies answer in the same envelope as every other failure.
impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "rejected request body");
        AuthError::Validation(rejection.body_text())
    }
}

impl AuthError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::Store(_) | AuthError::Signing(_) | AuthError::Hash(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Message safe to hand to the client.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Store(_) | AuthError::Signing(_) | AuthError::Hash(_) => {
                GENERIC_FAILURE.to_string()
            }
            other => other.to_string(),
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Store(_) | AuthError::Signing(_) | AuthError::Hash(_)
        )
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = if self.is_internal() { "error" } else { "fail" };
        if self.is_internal() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let body = json!({
            "status": status,
            "message": self.public_message(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_becomes_domain_conflict() {
        let err: AuthError = StoreError::Conflict.into();
        assert!(matches!(err, AuthError::Conflict));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_internal_errors_hide_cause() {
        let err: AuthError = StoreError::Timeout(std::time::Duration::from_secs(5)).into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.public_message(), GENERIC_FAILURE);
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_invalid_credentials_message_is_fixed() {
        assert_eq!(AuthError::InvalidCredentials.public_message(), INVALID_CREDENTIALS);
        assert_eq!(AuthError::InvalidCredentials.status_code(), StatusCode::BAD_REQUEST);
    }
}
