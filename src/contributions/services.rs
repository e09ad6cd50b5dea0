use bytes::Bytes;
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo;
use super::repo_types::Contribution;
use crate::config::ResubmitPolicy;
use crate::db::WriteTx;
use crate::error::{LabelError, LabelResult};
use crate::images::repo as images_repo;
use crate::state::AppState;
use crate::users::repo_types::User;

pub(crate) const MAX_LABEL_LEN: usize = 256;

pub struct MaskUpload<'a> {
    pub body: Bytes,
    pub content_type: &'a str,
}

fn normalize_label(raw: &str) -> LabelResult<&str> {
    let label = raw.trim();
    if label.is_empty() {
        return Err(LabelError::InvalidInput("label must not be empty".into()));
    }
    if label.chars().count() > MAX_LABEL_LEN {
        return Err(LabelError::InvalidInput(format!(
            "label longer than {} characters",
            MAX_LABEL_LEN
        )));
    }
    Ok(label)
}

async fn ensure_references(db: &SqlitePool, user_id: i64, image_id: i64) -> LabelResult<()> {
    if !User::exists(db, user_id).await? {
        return Err(LabelError::InvalidReference(format!("user {} does not exist", user_id)));
    }
    if !images_repo::exists(db, image_id).await? {
        return Err(LabelError::InvalidReference(format!("image {} does not exist", image_id)));
    }
    Ok(())
}

async fn load(db: &SqlitePool, user_id: i64, image_id: i64) -> LabelResult<Contribution> {
    repo::find(db, user_id, image_id)
        .await?
        .ok_or_else(|| LabelError::NotFound(format!("contribution ({}, {})", user_id, image_id)))
}

#[instrument(skip(st, label))]
pub async fn save_label(
    st: &AppState,
    user_id: i64,
    image_id: i64,
    label: &str,
) -> LabelResult<Contribution> {
    let label = normalize_label(label)?;
    ensure_references(&st.db, user_id, image_id).await?;

    if !repo::upsert_label(&st.db, user_id, image_id, label, st.config.resubmit_policy).await? {
        return Err(LabelError::AlreadyExists(format!(
            "label for user {} on image {}",
            user_id, image_id
        )));
    }
    info!(user_id, image_id, "label saved");
    load(&st.db, user_id, image_id).await
}

/// Stores the mask blob under a fresh name, then points the contribution at it.
/// The blob is removed again if the database step does not commit.
#[instrument(skip(st, upload), fields(bytes = upload.body.len()))]
pub async fn save_mask(
    st: &AppState,
    user_id: i64,
    image_id: i64,
    upload: MaskUpload<'_>,
) -> LabelResult<Contribution> {
    if upload.body.is_empty() {
        return Err(LabelError::InvalidInput("mask file is empty".into()));
    }
    ensure_references(&st.db, user_id, image_id).await?;

    let policy = st.config.resubmit_policy;
    let key = format!(
        "{}.{}",
        Uuid::new_v4(),
        crate::storage::ext_from_mime(upload.content_type)
    );
    st.storage
        .put_object(&key, upload.body, upload.content_type)
        .await
        .map_err(|e| LabelError::Storage(e.context(format!("put_object {}", key))))?;

    let previous = match record_mask(&st.db, user_id, image_id, &key, policy).await {
        Ok(previous) => previous,
        Err(e) => {
            if let Err(del) = st.storage.delete_object(&key).await {
                warn!(error = %del, %key, "failed to remove orphaned mask");
            }
            return Err(e);
        }
    };

    if let Some(old) = previous.filter(|old| *old != key) {
        if let Err(e) = st.storage.delete_object(&old).await {
            warn!(error = %e, key = %old, "failed to remove replaced mask");
        }
    }
    info!(user_id, image_id, %key, "mask saved");
    load(&st.db, user_id, image_id).await
}

/// Returns the mask path this write replaced, if any.
///
/// The write lock is held before `previous` is read, so a concurrent writer is
/// either fully visible or still waiting; the loser sees the winner's mask.
async fn record_mask(
    db: &SqlitePool,
    user_id: i64,
    image_id: i64,
    key: &str,
    policy: ResubmitPolicy,
) -> LabelResult<Option<String>> {
    let mut tx = WriteTx::begin(db).await?;
    let previous = repo::mask_path(tx.conn()?, user_id, image_id).await?;
    if !repo::upsert_mask(tx.conn()?, user_id, image_id, key, policy).await? {
        tx.rollback().await?;
        return Err(LabelError::AlreadyExists(format!(
            "mask for user {} on image {}",
            user_id, image_id
        )));
    }
    tx.commit().await?;
    Ok(previous)
}

pub async fn get(st: &AppState, user_id: i64, image_id: i64) -> LabelResult<(Contribution, Option<String>)> {
    let c = load(&st.db, user_id, image_id).await?;
    let url = match &c.mask_path {
        Some(key) => Some(
            st.storage
                .url_for(key)
                .await
                .map_err(|e| LabelError::Storage(e.context("mask url")))?,
        ),
        None => None,
    };
    Ok((c, url))
}
