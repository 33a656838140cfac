//! # Session Gate
//!
//! Account sign-up, credential verification and signed-token sessions for a
//! web service.
//!
//! ## Architecture
//! - `auth::store`: credential store adapter (PostgreSQL or in-memory)
//! - `auth::password`: Argon2id hashing and verification
//! - `auth::jwt`: access/refresh token issuance and validation
//! - `auth::session`: sign-up, sign-in, refresh and logout flows
//! - `routes`: HTTP handlers over the session controller
//! - `server`: application state and router assembly

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod routes;
pub mod server;
