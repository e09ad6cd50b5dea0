use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use tracing::instrument;

use crate::{
    error::{LabelError, LabelResult},
    state::AppState,
};

use super::dto::{ContributionDetails, LabelRequest, MaskForm, SavedResponse};
use super::services::{self, MaskUpload};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/contributions/:user_id/:image_id", get(get_contribution))
}

pub fn write_routes(max_mask_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/label", post(save_label))
        .route("/mask", post(save_mask).layer(DefaultBodyLimit::max(max_mask_bytes)))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn save_label(
    State(state): State<AppState>,
    Form(req): Form<LabelRequest>,
) -> LabelResult<Json<SavedResponse>> {
    let c = services::save_label(&state, req.user_id, req.image_id, &req.label).await?;
    Ok(Json(SavedResponse::saved(&c)))
}

fn parse_id(field: &str, raw: &str) -> LabelResult<i64> {
    raw.trim()
        .parse()
        .map_err(|_| LabelError::InvalidInput(format!("{} must be an integer", field)))
}

fn multipart_error(e: MultipartError) -> LabelError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        LabelError::PayloadTooLarge(e.body_text())
    } else {
        LabelError::InvalidInput(e.body_text())
    }
}

async fn read_mask_form(mp: &mut Multipart) -> LabelResult<MaskForm> {
    let mut form = MaskForm::default();
    while let Some(field) = mp.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("user_id") => {
                let raw = field.text().await.map_err(multipart_error)?;
                form.user_id = Some(parse_id("user_id", &raw)?);
            }
            Some("image_id") => {
                let raw = field.text().await.map_err(multipart_error)?;
                form.image_id = Some(parse_id("image_id", &raw)?);
            }
            Some("file") => {
                let content_type = field.content_type().unwrap_or("image/png").to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                form.file = Some((data, content_type));
            }
            _ => {}
        }
    }
    Ok(form)
}

/// POST /mask (multipart: user_id, image_id, file)
#[instrument(skip(state, mp))]
pub async fn save_mask(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> LabelResult<Json<SavedResponse>> {
    let form = read_mask_form(&mut mp).await?;
    let missing = |f: &str| LabelError::InvalidInput(format!("{} is required", f));
    let user_id = form.user_id.ok_or_else(|| missing("user_id"))?;
    let image_id = form.image_id.ok_or_else(|| missing("image_id"))?;
    let (body, content_type) = form.file.ok_or_else(|| missing("file"))?;

    let c = services::save_mask(
        &state,
        user_id,
        image_id,
        MaskUpload {
            body,
            content_type: &content_type,
        },
    )
    .await?;
    Ok(Json(SavedResponse::saved(&c)))
}

#[instrument(skip(state))]
pub async fn get_contribution(
    State(state): State<AppState>,
    Path((user_id, image_id)): Path<(i64, i64)>,
) -> LabelResult<Json<ContributionDetails>> {
    let (c, mask_url) = services::get(&state, user_id, image_id).await?;
    Ok(Json(ContributionDetails::new(c, mask_url)))
}
