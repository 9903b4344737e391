use async_trait::async_trait;
use serde::Serialize;
use sqlx::sqlite::SqlitePool;

use crate::store::{StoreError, WalletRepository};

#[derive(Clone)]
pub struct WalletStore {
    pool: SqlitePool,
}

/// Per-user wallet. Balance is demo data in minor units.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Wallet {
    #[serde(skip)]
    pub id: String,
    #[serde(skip)]
    pub user_id: String,
    pub balance: i64,
}

impl WalletStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an empty wallet for a user.
    pub async fn create_for_user(&self, user_id: &str) -> Result<Wallet, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO wallets (id, user_id, balance) VALUES (?, ?, 0)")
            .bind(&id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(Wallet {
            id,
            user_id: user_id.to_string(),
            balance: 0,
        })
    }

    pub async fn get_by_user(&self, user_id: &str) -> Result<Option<Wallet>, sqlx::Error> {
        sqlx::query_as("SELECT id, user_id, balance FROM wallets WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[async_trait]
impl WalletRepository for WalletStore {
    async fn create_for_user(&self, user_id: &str) -> Result<Wallet, StoreError> {
        Ok(WalletStore::create_for_user(self, user_id).await?)
    }
}
