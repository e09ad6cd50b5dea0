use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,                    // stable user ID
    pub name: String,               // claimed display name, unique
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime, // first login
}
