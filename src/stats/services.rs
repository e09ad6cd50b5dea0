use sqlx::SqlitePool;
use tracing::instrument;

use super::repo::{self, LeaderboardEntry};
use crate::error::LabelResult;
use crate::users::services::require_user;

/// Number of contributions recorded for a registered user.
#[instrument(skip(db))]
pub async fn count_for_user(db: &SqlitePool, user_id: i64) -> LabelResult<i64> {
    require_user(db, user_id).await?;
    Ok(repo::count_for_user(db, user_id).await?)
}

/// Top `limit` contributors, `limit` clamped to `1..=max`.
#[instrument(skip(db))]
pub async fn leaderboard(db: &SqlitePool, limit: i64, max: i64) -> LabelResult<Vec<LeaderboardEntry>> {
    let limit = limit.clamp(1, max.max(1));
    Ok(repo::leaderboard(db, limit).await?)
}
