use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{LeaderboardQuery, UserStats};
use super::repo::LeaderboardEntry;
use super::services;
use crate::{error::LabelResult, state::AppState};

pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/stats/:user_id", get(user_stats))
        .route("/leaderboard", get(leaderboard))
}

#[instrument(skip(state))]
pub async fn user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> LabelResult<Json<UserStats>> {
    let count = services::count_for_user(&state.db, user_id).await?;
    Ok(Json(UserStats { user_id, count }))
}

#[instrument(skip(state))]
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(q): Query<LeaderboardQuery>,
) -> LabelResult<Json<Vec<LeaderboardEntry>>> {
    let limit = q.limit.unwrap_or(state.config.leaderboard_limit);
    let board = services::leaderboard(&state.db, limit, state.config.leaderboard_max).await?;
    Ok(Json(board))
}
