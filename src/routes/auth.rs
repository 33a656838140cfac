//! Auth routes for registration, login, token refresh and logout

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::{WithRejection, cookie::CookieJar};
use serde_json::json;

use crate::auth::cookies::REFRESH_COOKIE;
use crate::auth::models::{RefreshResponse, SignInRequest, SignInResponse, SignUpRequest};
use crate::error::{AuthError, AuthResult};
use crate::server::AppState;

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<SignUpRequest>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    let user = state.sessions.sign_up(payload).await?;

    let body = json!({
        "status": "success",
        "data": { "user": user },
    });
    Ok((StatusCode::CREATED, Json(body)))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<SignInRequest>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    let signed_in = state.sessions.sign_in(payload).await?;

    let jar = signed_in.cookies.apply(jar);
    let body = SignInResponse {
        status: "success".to_string(),
        access_token: signed_in.access_token,
        refresh_token: signed_in.refresh_token,
        message: "User signed in successfully".to_string(),
        user: signed_in.user,
    };
    Ok((StatusCode::CREATED, jar, Json(body)))
}

/// `GET /api/auth/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthError> {
    let refresh_token = jar.get(REFRESH_COOKIE).map(|cookie| cookie.value().to_string());
    let refreshed = state.sessions.refresh(refresh_token.as_deref()).await?;

    let jar = refreshed.cookies.apply(jar);
    let body = RefreshResponse {
        status: "success".to_string(),
        access_token: refreshed.access_token,
    };
    Ok((StatusCode::OK, jar, Json(body)))
}

/// `GET /api/auth/logout`
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let logged_out = state.sessions.logout();
    (
        StatusCode::OK,
        logged_out.cookies.apply(jar),
        Json(json!({ "status": "success" })),
    )
}

pub fn create_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", get(refresh))
        .route("/api/auth/logout", get(logout).post(logout))
}
