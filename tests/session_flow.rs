//! End-to-end session flow through the HTTP router
//!
//! Drives register -> login -> me -> refresh -> logout against the
//! in-memory credential store.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use jsonwebtoken::Algorithm;
use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde_json::{Value, json};
use session_gate::auth::cookies::CookiePolicy;
use session_gate::auth::jwt::{TokenKeys, TokenPolicy};
use session_gate::auth::{MemoryCredentialStore, PasswordService, SessionController, TokenKind, TokenService};
use session_gate::config::{CookieConfig, HashingConfig};
use session_gate::error::INVALID_CREDENTIALS;
use session_gate::server::{AppState, build_router};
use tower::ServiceExt;

fn ed25519_keys() -> TokenKeys {
    let rng = SystemRandom::new();
    let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
    let pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
    TokenKeys::from_ed_der(pkcs8.as_ref(), pair.public_key().as_ref())
}

struct TestApp {
    router: Router,
    tokens: Arc<TokenService>,
}

fn test_app() -> TestApp {
    let tokens = Arc::new(TokenService::new(
        Algorithm::EdDSA,
        TokenPolicy::new(ed25519_keys(), Duration::from_secs(15 * 60)),
        TokenPolicy::new(ed25519_keys(), Duration::from_secs(60 * 60)),
    ));
    let passwords = PasswordService::new(HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap();
    let controller = SessionController::new(
        Arc::new(MemoryCredentialStore::new()),
        passwords,
        Arc::clone(&tokens),
        CookiePolicy::new(
            &CookieConfig::default(),
            Duration::from_secs(15 * 60),
            Duration::from_secs(60 * 60),
        ),
    );
    TestApp {
        router: build_router(AppState::new(controller)),
        tokens,
    }
}

struct Reply {
    status: StatusCode,
    cookies: Vec<String>,
    body: Value,
}

impl Reply {
    /// `name=value` of a Set-Cookie header, for replaying as a Cookie header.
    fn cookie_pair(&self, name: &str) -> Option<String> {
        self.cookies
            .iter()
            .find(|c| c.starts_with(&format!("{name}=")))
            .and_then(|c| c.split(';').next())
            .map(str::to_string)
    }

    fn set_cookie(&self, name: &str) -> Option<&String> {
        self.cookies.iter().find(|c| c.starts_with(&format!("{name}=")))
    }
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookies = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply { status, cookies, body }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_cookie(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn register(app: &Router, email: &str, password: &str) -> Reply {
    send(
        app,
        post_json(
            "/api/auth/register",
            json!({
                "name": "A",
                "email": email,
                "password": password,
                "passwordConfirmation": password,
            }),
        ),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str) -> Reply {
    send(app, post_json("/api/auth/login", json!({ "email": email, "password": password }))).await
}

#[tokio::test]
async fn test_register_login_refresh_logout() {
    let app = test_app();

    let registered = register(&app.router, "A@X.com", "abcdefgh").await;
    assert_eq!(registered.status, StatusCode::CREATED);
    let user = &registered.body["data"]["user"];
    assert_eq!(user["email"], "a@x.com");
    assert_eq!(user["role"], "user");
    assert!(user.get("password_hash").is_none());
    let user_id = user["id"].as_str().unwrap().to_string();

    let signed_in = login(&app.router, "a@x.com", "abcdefgh").await;
    assert_eq!(signed_in.status, StatusCode::CREATED);
    assert_eq!(signed_in.body["user"]["id"], user_id.as_str());
    let access_token = signed_in.body["access_token"].as_str().unwrap().to_string();
    let subject = app.tokens.validate(&access_token, TokenKind::Access).unwrap();
    assert_eq!(subject.to_string(), user_id);

    let access_cookie = signed_in.set_cookie("access_token").unwrap();
    assert!(access_cookie.contains("HttpOnly"));
    assert!(access_cookie.contains("Path=/"));
    assert!(access_cookie.contains("Domain=localhost"));
    assert!(access_cookie.contains("Max-Age=900"));
    assert!(signed_in.set_cookie("refresh_token").unwrap().contains("Max-Age=3600"));
    assert!(!signed_in.set_cookie("logged_in").unwrap().contains("HttpOnly"));

    let access_pair = signed_in.cookie_pair("access_token").unwrap();
    let me = send(&app.router, get_with_cookie("/api/users/me", Some(&access_pair))).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["user"]["id"], user_id.as_str());

    let refresh_pair = signed_in.cookie_pair("refresh_token").unwrap();
    let refreshed = send(&app.router, get_with_cookie("/api/auth/refresh", Some(&refresh_pair))).await;
    assert_eq!(refreshed.status, StatusCode::OK);
    let new_access = refreshed.body["access_token"].as_str().unwrap();
    assert_eq!(app.tokens.validate(new_access, TokenKind::Access).unwrap().to_string(), user_id);
    assert!(refreshed.set_cookie("access_token").is_some());
    assert!(refreshed.set_cookie("logged_in").is_some());
    assert!(refreshed.set_cookie("refresh_token").is_none());

    let logged_out = send(&app.router, get_with_cookie("/api/auth/logout", None)).await;
    assert_eq!(logged_out.status, StatusCode::OK);
    assert_eq!(logged_out.body["status"], "success");
    for name in ["access_token", "refresh_token", "logged_in"] {
        let cleared = logged_out.set_cookie(name).unwrap();
        assert!(cleared.starts_with(&format!("{name}=;")), "{cleared}");
        assert!(cleared.contains("Max-Age=0"), "{cleared}");
    }

    // logout does not revoke: the old access token keeps working until it expires
    let me_again = send(&app.router, get_with_cookie("/api/users/me", Some(&access_pair))).await;
    assert_eq!(me_again.status, StatusCode::OK);
}

#[tokio::test]
async fn test_bearer_header_is_accepted() {
    let app = test_app();
    register(&app.router, "a@x.com", "abcdefgh").await;
    let signed_in = login(&app.router, "a@x.com", "abcdefgh").await;
    let token = signed_in.body["access_token"].as_str().unwrap();

    let request = Request::get("/api/users/me")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let me = send(&app.router, request).await;
    assert_eq!(me.status, StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = test_app();
    assert_eq!(register(&app.router, "a@x.com", "abcdefgh").await.status, StatusCode::CREATED);

    let second = register(&app.router, "A@x.COM", "abcdefgh").await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["status"], "fail");
    assert_eq!(second.body["message"], "User with that email already exists");
}

#[tokio::test]
async fn test_registration_validation() {
    let app = test_app();

    let short = register(&app.router, "a@x.com", "short").await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);

    let mismatch = send(
        &app.router,
        post_json(
            "/api/auth/register",
            json!({
                "name": "A",
                "email": "a@x.com",
                "password": "abcdefgh",
                "passwordConfirmation": "abcdefgX",
            }),
        ),
    )
    .await;
    assert_eq!(mismatch.status, StatusCode::BAD_REQUEST);
    assert_eq!(mismatch.body["message"], "Passwords do not match");

    // nothing was stored, so the email is still free
    assert_eq!(register(&app.router, "a@x.com", "abcdefgh").await.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_unreadable_bodies_use_the_error_envelope() {
    let app = test_app();

    let malformed = Request::post("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let reply = send(&app.router, malformed).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["status"], "fail");
    assert!(reply.body["message"].as_str().is_some_and(|m| !m.is_empty()));

    let wrong_type = send(&app.router, post_json("/api/auth/register", json!({ "name": 5 }))).await;
    assert_eq!(wrong_type.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_type.body["status"], "fail");
    assert!(wrong_type.body["message"].is_string());

    let no_content_type = Request::post("/api/auth/login")
        .body(Body::from(json!({ "email": "a@x.com", "password": "abcdefgh" }).to_string()))
        .unwrap();
    let reply = send(&app.router, no_content_type).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["status"], "fail");
}

#[tokio::test]
async fn test_login_failures_are_identical() {
    let app = test_app();
    register(&app.router, "a@x.com", "abcdefgh").await;

    let unknown = login(&app.router, "nobody@x.com", "abcdefgh").await;
    let wrong = login(&app.router, "a@x.com", "abcdefgX").await;

    assert_eq!(unknown.status, wrong.status);
    assert_eq!(unknown.body, wrong.body);
    assert_eq!(unknown.body["message"], INVALID_CREDENTIALS);
    assert!(unknown.cookies.is_empty());
    assert!(wrong.cookies.is_empty());
}

#[tokio::test]
async fn test_refresh_without_or_with_bad_cookie_is_forbidden() {
    let app = test_app();

    let missing = send(&app.router, get_with_cookie("/api/auth/refresh", None)).await;
    assert_eq!(missing.status, StatusCode::FORBIDDEN);
    assert_eq!(missing.body["message"], "could not refresh access token");

    let garbage = send(
        &app.router,
        get_with_cookie("/api/auth/refresh", Some("refresh_token=garbage")),
    )
    .await;
    assert_eq!(garbage.status, StatusCode::FORBIDDEN);
    assert_eq!(garbage.body["status"], "fail");
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = test_app();

    let me = send(&app.router, get_with_cookie("/api/users/me", None)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
    assert_eq!(me.body["message"], "You are not logged in");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = test_app();

    let ping = send(&app.router, get_with_cookie("/ping", None)).await;
    assert_eq!(ping.status, StatusCode::OK);
    assert_eq!(ping.body["status"], "pong");

    let health = send(&app.router, get_with_cookie("/api/healthchecker", None)).await;
    assert_eq!(health.status, StatusCode::OK);
}
