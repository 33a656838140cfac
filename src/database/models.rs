// Database Models
//
// Typed rows for the `users` table. Every column is read through `FromRow`
// so a schema drift surfaces as a row error instead of a runtime panic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::StoreError;

/// Trait for converting from tokio-postgres Row
pub trait FromRow {
    fn from_row(row: &Row) -> Result<Self, StoreError>
    where
        Self: Sized;
}

/// Account lifecycle status, stored as SMALLINT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Active,
    Disabled,
}

impl AccountStatus {
    /// Statuses that may authenticate.
    pub const USABLE: [AccountStatus; 2] = [AccountStatus::Pending, AccountStatus::Active];

    pub fn code(self) -> i16 {
        match self {
            AccountStatus::Pending => 0,
            AccountStatus::Active => 1,
            AccountStatus::Disabled => 2,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(AccountStatus::Pending),
            1 => Some(AccountStatus::Active),
            2 => Some(AccountStatus::Disabled),
            _ => None,
        }
    }

    pub fn is_usable(self) -> bool {
        Self::USABLE.contains(&self)
    }

    pub fn usable_codes() -> Vec<i16> {
        Self::USABLE.iter().map(|s| s.code()).collect()
    }
}

/// Role identifier carried on the account and in the user projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn code(self) -> i16 {
        match self {
            Role::Admin => 1,
            Role::User => 2,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Role::Admin),
            2 => Some(Role::User),
            _ => None,
        }
    }
}

/// Identity record owned by the credential store.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
    pub status: AccountStatus,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a fresh, active, standard-role account. Email is normalized here.
    pub fn new(id: Uuid, name: &str, email: &str, password_hash: String) -> Self {
        let now = Utc::now();
        let email = normalize_email(email);
        Self {
            id,
            username: email.clone(),
            email,
            name: name.trim().to_string(),
            role: Role::default(),
            password_hash,
            status: AccountStatus::Active,
            avatar: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Client-facing projection; never includes the password hash.
    pub fn projection(&self) -> AccountProjection {
        AccountProjection {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            avatar: self.avatar.clone(),
        }
    }
}

impl FromRow for Account {
    fn from_row(row: &Row) -> Result<Self, StoreError> {
        let status_code: i16 = row.try_get("status")?;
        let role_code: i16 = row.try_get("role_id")?;
        Ok(Self {
            id: row.try_get("userid")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            role: Role::from_code(role_code)
                .ok_or_else(|| StoreError::Row(format!("unknown role_id {role_code}")))?,
            password_hash: row.try_get("password_hash")?,
            status: AccountStatus::from_code(status_code)
                .ok_or_else(|| StoreError::Row(format!("unknown status {status_code}")))?,
            avatar: row.try_get("avatar")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Sanitized user view returned by sign-up, sign-in and `/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProjection {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
