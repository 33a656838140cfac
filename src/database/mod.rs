//! # Database Module
//!
//! PostgreSQL integration through tokio-postgres and deadpool.
//! Includes connection management, typed models, and migrations.

pub mod connection;
pub mod migrations;
pub mod models;

pub use connection::{DatabaseConfig, DatabaseConnection};
pub use models::*;
