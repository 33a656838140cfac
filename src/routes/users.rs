//! User routes behind the access-token middleware

use axum::{Extension, Json, Router, middleware, routing::get};
use serde_json::{Value, json};

use crate::auth::middleware::require_auth;
use crate::database::models::Account;
use crate::server::AppState;

/// `GET /api/users/me`
pub async fn me(Extension(account): Extension<Account>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "data": { "user": account.projection() },
    }))
}

pub fn create_user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/users/me", get(me))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
