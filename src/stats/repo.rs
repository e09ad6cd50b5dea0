use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub user_id: i64,
    pub name: String,
    pub count: i64,
}

pub async fn count_for_user(db: &SqlitePool, user_id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM contributions WHERE user_id = ?"#)
        .bind(user_id)
        .fetch_one(db)
        .await
}

/// Contributors ranked by count, ties by user id.
pub async fn leaderboard(db: &SqlitePool, limit: i64) -> sqlx::Result<Vec<LeaderboardEntry>> {
    sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT u.id AS user_id, u.name AS name, COUNT(c.id) AS count
          FROM users u
          JOIN contributions c ON c.user_id = u.id
         GROUP BY u.id, u.name
         ORDER BY count DESC, u.id ASC
         LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await
}
