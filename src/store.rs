//! Persistence capabilities consumed by the session service.
//!
//! The service only sees these traits; `db` provides the SQLite implementations.

use async_trait::async_trait;

use crate::db::{Identity, Wallet};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write (e.g. duplicate email).
    #[error("Unique constraint violated")]
    Conflict,
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Conflict,
            _ => StoreError::Database(e),
        }
    }
}

/// Fields needed to create an identity.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub rating_level: i64,
    pub is_admin: bool,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError>;
    async fn is_email_taken(&self, email: &str) -> Result<bool, StoreError>;
    async fn create(&self, identity: NewIdentity) -> Result<Identity, StoreError>;
    /// Remove an identity and everything that cascades from it.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn create_for_user(&self, user_id: &str) -> Result<Wallet, StoreError>;
}
