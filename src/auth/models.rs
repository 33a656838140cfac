//! Authentication Models
//!
//! Data structures for authentication requests and responses.

use serde::{Deserialize, Serialize};

use crate::database::models::AccountProjection;

/// Sign-up request payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

/// Sign-in request payload
#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Body returned on successful sign-in
#[derive(Debug, Serialize, Deserialize)]
pub struct SignInResponse {
    pub status: String,
    pub access_token: String,
    pub refresh_token: String,
    pub message: String,
    pub user: AccountProjection,
}

/// Body returned on successful refresh
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub status: String,
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_payload_uses_camel_case_confirmation() {
        let payload: SignUpRequest = serde_json::from_str(
            r#"{"name":"A","email":"A@X.com","password":"abcdefgh","passwordConfirmation":"abcdefgh"}"#,
        )
        .unwrap();
        assert_eq!(payload.password_confirmation, "abcdefgh");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let payload: SignUpRequest = serde_json::from_str(r#"{"email":"a@x.com"}"#).unwrap();
        assert!(payload.password.is_empty());
        assert!(payload.password_confirmation.is_empty());
    }
}
