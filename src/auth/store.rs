//! Credential Store Adapter
//!
//! The only component that touches persistent account state. Every query
//! binds user-supplied values as parameters; nothing is interpolated into
//! SQL text.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use deadpool_postgres::Pool;
use tokio_postgres::error::SqlState;
use uuid::Uuid;

use crate::database::models::{Account, AccountStatus, FromRow, normalize_email};
use crate::database::DatabaseConnection;
use crate::error::StoreError;

const ACCOUNT_COLUMNS: &str =
    "userid, username, email, name, role_id, password_hash, status, avatar, created_at, updated_at";

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Lookup by email among accounts allowed to authenticate (active or pending).
    async fn find_active_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Persist a new account. A duplicate email yields `StoreError::Conflict`.
    async fn create_account(&self, account: Account) -> Result<Account, StoreError>;

    /// Lookup by identifier, any status.
    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: Pool,
    timeout: Duration,
}

impl PgCredentialStore {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self {
            pool: db.pool().clone(),
            timeout: db.query_timeout(),
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_active_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = normalize_email(email);
        let usable = AccountStatus::usable_codes();
        self.bounded(async {
            let client = self.pool.get().await?;
            let query = format!(
                "SELECT {ACCOUNT_COLUMNS} FROM users WHERE lower(email) = $1 AND status = ANY($2) LIMIT 1"
            );
            let row = client.query_opt(query.as_str(), &[&email, &usable]).await?;
            row.map(|r| Account::from_row(&r)).transpose()
        })
        .await
    }

    async fn create_account(&self, account: Account) -> Result<Account, StoreError> {
        self.bounded(async {
            let client = self.pool.get().await?;
            let query = format!(
                "INSERT INTO users (userid, username, email, name, role_id, password_hash, status, avatar, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {ACCOUNT_COLUMNS}"
            );
            let result = client
                .query_one(
                    query.as_str(),
                    &[
                        &account.id,
                        &account.username,
                        &account.email,
                        &account.name,
                        &account.role.code(),
                        &account.password_hash,
                        &account.status.code(),
                        &account.avatar,
                        &account.created_at,
                        &account.updated_at,
                    ],
                )
                .await;

            match result {
                Ok(row) => Account::from_row(&row),
                Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => Err(StoreError::Conflict),
                Err(e) => Err(StoreError::Database(e)),
            }
        })
        .await
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        self.bounded(async {
            let client = self.pool.get().await?;
            let query = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE userid = $1");
            let row = client.query_opt(query.as_str(), &[&id]).await?;
            row.map(|r| Account::from_row(&r)).transpose()
        })
        .await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.bounded(async {
            let client = self.pool.get().await?;
            client.query_one("SELECT 1", &[]).await?;
            Ok(())
        })
        .await
    }
}

/// In-process store with the same uniqueness guarantee as the `users` table.
#[derive(Default)]
pub struct MemoryCredentialStore {
    accounts: DashMap<Uuid, Account>,
    emails: DashMap<String, Uuid>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Returns false when the account does not exist.
    pub fn set_status(&self, id: Uuid, status: AccountStatus) -> bool {
        match self.accounts.get_mut(&id) {
            Some(mut account) => {
                account.status = status;
                account.updated_at = chrono::Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: Uuid) -> Option<Account> {
        let (_, account) = self.accounts.remove(&id)?;
        self.emails.remove(&account.email);
        Some(account)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_active_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = normalize_email(email);
        let Some(id) = self.emails.get(&email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self
            .accounts
            .get(&id)
            .map(|entry| entry.value().clone())
            .filter(|account| account.status.is_usable()))
    }

    async fn create_account(&self, mut account: Account) -> Result<Account, StoreError> {
        account.email = normalize_email(&account.email);
        match self.emails.entry(account.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                self.accounts.insert(account.id, account.clone());
                slot.insert(account.id);
                Ok(account)
            }
        }
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
