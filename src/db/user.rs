use async_trait::async_trait;
use serde::Serialize;
use sqlx::sqlite::SqlitePool;

use crate::store::{NewIdentity, StoreError, UserRepository};

/// Rating level given to new accounts.
pub const DEFAULT_RATING_LEVEL: i64 = 3;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// A registered principal. The password hash never leaves the server.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub avatar_url: Option<String>,
    pub rating_level: i64,
    pub is_admin: bool,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    middle_name: Option<String>,
    avatar_url: Option<String>,
    rating_level: i64,
    is_admin: i32,
    created_at: String,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            middle_name: row.middle_name,
            avatar_url: row.avatar_url,
            rating_level: row.rating_level,
            is_admin: row.is_admin != 0,
            created_at: row.created_at,
        }
    }
}

/// Public user summary for the admin listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub rating_level: i64,
    pub is_admin: bool,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct UserSummaryRow {
    id: String,
    email: String,
    rating_level: i64,
    is_admin: i32,
    created_at: String,
}

impl From<UserSummaryRow> for UserSummary {
    fn from(row: UserSummaryRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            rating_level: row.rating_level,
            is_admin: row.is_admin != 0,
            created_at: row.created_at,
        }
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new identity with a fresh UUID and return it.
    pub async fn create(&self, new: &NewIdentity) -> Result<Identity, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, middle_name, rating_level, is_admin)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.middle_name)
        .bind(new.rating_level)
        .bind(new.is_admin as i32)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Get a user by email (exact, case-sensitive match).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Identity>, sqlx::Error> {
        let row: Option<IdentityRow> = sqlx::query_as(
            "SELECT id, email, password_hash, first_name, last_name, middle_name, avatar_url, rating_level, is_admin, created_at
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Identity::from))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Identity>, sqlx::Error> {
        let row: Option<IdentityRow> = sqlx::query_as(
            "SELECT id, email, password_hash, first_name, last_name, middle_name, avatar_url, rating_level, is_admin, created_at
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Identity::from))
    }

    pub async fn is_email_taken(&self, email: &str) -> Result<bool, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// List all users, newest first.
    pub async fn list(&self) -> Result<Vec<UserSummary>, sqlx::Error> {
        let rows: Vec<UserSummaryRow> = sqlx::query_as(
            "SELECT id, email, rating_level, is_admin, created_at FROM users ORDER BY created_at DESC, email",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(UserSummary::from).collect())
    }

    /// Delete a user by ID. The wallet goes with it.
    pub async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.get_by_email(email).await?)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.get_by_id(id).await?)
    }

    async fn is_email_taken(&self, email: &str) -> Result<bool, StoreError> {
        Ok(UserStore::is_email_taken(self, email).await?)
    }

    async fn create(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        Ok(UserStore::create(self, &identity).await?)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(UserStore::delete(self, id).await?)
    }
}
