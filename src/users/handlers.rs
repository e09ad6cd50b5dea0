use axum::{extract::State, routing::post, Form, Json, Router};
use tracing::instrument;

use crate::{
    error::LabelResult,
    state::AppState,
    users::{
        dto::{LoginRequest, LoginResponse},
        services,
    },
};

pub fn login_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

#[instrument(skip(state))]
pub async fn login(
    State(state): State<AppState>,
    Form(payload): Form<LoginRequest>,
) -> LabelResult<Json<LoginResponse>> {
    let user = services::login(&state.db, &payload.name, payload.mode).await?;
    Ok(Json(LoginResponse {
        user_id: user.id,
        name: user.name,
    }))
}
