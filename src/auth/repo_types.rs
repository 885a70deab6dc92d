use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,                    // assigned by the store
    pub username: String,           // unique
    pub password_hash: String,      // argon2 PHC string, never exposed
    pub created_at: OffsetDateTime, // set on insert
}
