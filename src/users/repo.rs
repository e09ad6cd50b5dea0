use crate::users::repo_types::User;
use sqlx::SqlitePool;
use time::OffsetDateTime;

impl User {
    /// Find a user by display name.
    pub async fn find_by_name(db: &SqlitePool, name: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, created_at
            FROM users
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(r#"SELECT id, name, created_at FROM users WHERE id = ?"#)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn exists(db: &SqlitePool, id: i64) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>(r#"SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)"#)
            .bind(id)
            .fetch_one(db)
            .await
    }

    /// Create a new user. Fails with a unique violation if the name is taken.
    pub async fn create(db: &SqlitePool, name: &str) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, created_at)
            VALUES (?, ?)
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await
    }
}
