use std::path::Path;

use anyhow::Context;
use rand::{seq::SliceRandom, Rng};
use sqlx::SqlitePool;
use tracing::{debug, info, instrument, warn};

use super::repo;
use super::repo_types::Image;
use crate::error::LabelResult;
use crate::users::services::require_user;

/// Outcome of asking for the next image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextImage {
    Assigned(Image),
    Exhausted,
}

fn is_image_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    [".jpg", ".jpeg", ".png"].iter().any(|ext| lower.ends_with(ext))
}

/// Insert every filename from the manifest that is not already cataloged.
/// Returns the number of new rows.
pub async fn seed_from_manifest<I, S>(db: &SqlitePool, filenames: I) -> anyhow::Result<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tx = db.begin().await.context("begin tx")?;
    let mut inserted = 0;
    for name in filenames {
        let name = name.as_ref().trim();
        if name.is_empty() {
            continue;
        }
        if repo::insert_ignore_tx(&mut tx, name).await? {
            inserted += 1;
        }
    }
    tx.commit().await.context("commit tx")?;
    Ok(inserted)
}

/// Scan `dir` for jpg/jpeg/png files and seed them. A missing directory is created empty.
#[instrument(skip(db, dir), fields(dir = %dir.as_ref().display()))]
pub async fn seed_from_dir(db: &SqlitePool, dir: impl AsRef<Path>) -> anyhow::Result<usize> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("create image dir {}", dir.display()))?;

    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("read image dir {}", dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if is_image_file(&name) => names.push(name),
            Ok(_) => {}
            Err(raw) => warn!(name = ?raw, "skipping non-utf8 filename"),
        }
    }
    names.sort();

    let inserted = seed_from_manifest(db, &names).await?;
    let total = repo::count(db).await.context("count images")?;
    info!(found = names.len(), inserted, total, "image catalog seeded");
    Ok(inserted)
}

/// Uniform choice over the eligible set.
pub fn pick<R: Rng + ?Sized>(eligible: &[Image], rng: &mut R) -> NextImage {
    match eligible.choose(rng) {
        Some(img) => NextImage::Assigned(img.clone()),
        None => NextImage::Exhausted,
    }
}

/// One image `user_id` has not contributed to yet, chosen uniformly at random.
#[instrument(skip(db, rng))]
pub async fn next_image<R: Rng + ?Sized>(
    db: &SqlitePool,
    user_id: i64,
    rng: &mut R,
) -> LabelResult<NextImage> {
    require_user(db, user_id).await?;
    let eligible = repo::list_eligible_for_user(db, user_id).await?;
    let next = pick(&eligible, rng);
    match &next {
        NextImage::Assigned(img) => {
            debug!(image_id = img.id, eligible = eligible.len(), "image assigned")
        }
        NextImage::Exhausted => debug!("no eligible image left"),
    }
    Ok(next)
}
