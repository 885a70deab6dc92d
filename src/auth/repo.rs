use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::auth::repo_types::User;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let conflict = match &err {
            sqlx::Error::Database(db) => {
                db.is_unique_violation() || is_unique_violation_message(db.message())
            }
            _ => false,
        };
        if conflict {
            StoreError::UniqueViolation
        } else {
            StoreError::Database(err)
        }
    }
}

/// Fallback for drivers that report constraint failures only as text.
/// Only consulted after the structured `is_unique_violation` check.
pub(crate) fn is_unique_violation_message(message: &str) -> bool {
    let msg = message.to_lowercase();
    msg.contains("unique constraint")
        || msg.contains("constraint failed")
        || msg.contains("constraint violation")
        || msg.contains("duplicate")
        || (msg.contains("unique") && msg.contains("fail"))
}

/// Point lookups and inserts on the `users` table.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    /// Uniqueness is enforced by the table, so a taken username comes back
    /// as `StoreError::UniqueViolation`.
    async fn create(&self, username: &str, password_hash: &str) -> Result<User, StoreError>;
}

#[derive(Clone)]
pub struct SqliteUserStore {
    db: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES (?1, ?2)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }
}
