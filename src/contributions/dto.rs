use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::contributions::repo_types::Contribution;

/// Form body for `POST /label`.
#[derive(Debug, Deserialize)]
pub struct LabelRequest {
    pub user_id: i64,
    pub image_id: i64,
    pub label: String,
}

/// Multipart fields for `POST /mask`, collected before the save.
#[derive(Debug, Default)]
pub struct MaskForm {
    pub user_id: Option<i64>,
    pub image_id: Option<i64>,
    pub file: Option<(bytes::Bytes, String)>,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub status: &'static str,
    pub contribution_id: i64,
}

impl SavedResponse {
    pub fn saved(c: &Contribution) -> Self {
        Self {
            status: "saved",
            contribution_id: c.id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContributionDetails {
    pub id: i64,
    pub user_id: i64,
    pub image_id: i64,
    pub label: Option<String>,
    pub mask_path: Option<String>,
    pub mask_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ContributionDetails {
    pub fn new(c: Contribution, mask_url: Option<String>) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            image_id: c.image_id,
            label: c.label,
            mask_path: c.mask_path,
            mask_url,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}
