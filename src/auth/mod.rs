//! # Authentication Module
//!
//! Credential verification, password hashing, token issuance and the
//! session lifecycle built on top of them.

pub mod cookies;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod session;
pub mod store;

pub use jwt::{Claims, TokenError, TokenKind, TokenService};
pub use models::{SignInRequest, SignUpRequest};
pub use password::PasswordService;
pub use session::{SessionController, SessionState};
pub use store::{CredentialStore, MemoryCredentialStore, PgCredentialStore};
