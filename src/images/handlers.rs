use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use rand::{rngs::StdRng, SeedableRng};
use tracing::instrument;

use crate::{
    error::LabelResult,
    images::{
        dto::{NextImageQuery, NextImageResponse},
        services::{self, NextImage},
    },
    state::AppState,
};

pub fn image_routes() -> Router<AppState> {
    Router::new().route("/image", get(next_image))
}

#[instrument(skip(state))]
pub async fn next_image(
    State(state): State<AppState>,
    Query(q): Query<NextImageQuery>,
) -> LabelResult<Json<NextImageResponse>> {
    let mut rng = StdRng::from_entropy();
    let next = services::next_image(&state.db, q.user, &mut rng).await?;
    Ok(Json(match next {
        NextImage::Assigned(image) => NextImageResponse::assigned(image, &state.config.image_url_prefix),
        NextImage::Exhausted => NextImageResponse::done(),
    }))
}
