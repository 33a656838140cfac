// # Routes Module
//
// HTTP route handlers, grouped by functionality:
// - `health`: liveness and readiness endpoints
// - `auth`: sign-up, sign-in, refresh and logout
// - `users`: endpoints that require a valid access token

/// Health check and monitoring endpoints
pub mod health;

/// Session lifecycle endpoints
pub mod auth;

/// Authenticated user endpoints
pub mod users;
