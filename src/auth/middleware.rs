//! Authentication Middleware
//!
//! Axum middleware for access-token validation on protected routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::cookies::{ACCESS_COOKIE, REFRESH_COOKIE};
use crate::auth::session::SessionState;
use crate::error::AuthError;
use crate::server::AppState;

const NOT_LOGGED_IN: &str = "You are not logged in";
const ACCESS_EXPIRED: &str = "Access token expired, refresh required";

/// Bearer header first, `access_token` cookie second.
fn extract_access_token(req: &Request, jar: &CookieJar) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| {
            jar.get(ACCESS_COOKIE)
                .map(|cookie| cookie.value().to_string())
                .filter(|token| !token.is_empty())
        })
}

/// Validates the access token and injects the signed-in `Account` for handlers
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let access = extract_access_token(&req, &jar);
    let refresh = jar.get(REFRESH_COOKIE).map(|cookie| cookie.value().to_string());

    let session = state.sessions.state(access.as_deref(), refresh.as_deref());
    let token = match (session, access) {
        (SessionState::Authenticated { .. }, Some(token)) => token,
        (SessionState::Refreshable { account_id }, _) => {
            tracing::debug!(%account_id, "access token expired, refresh token still valid");
            return AuthError::Unauthorized(ACCESS_EXPIRED.to_string()).into_response();
        }
        _ => return AuthError::Unauthorized(NOT_LOGGED_IN.to_string()).into_response(),
    };

    let account = match state.sessions.current_account(&token).await {
        Ok(account) => account,
        Err(err) => return err.into_response(),
    };

    req.extensions_mut().insert(account);

    next.run(req).await
}
