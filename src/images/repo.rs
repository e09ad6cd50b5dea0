use anyhow::Context;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::images::repo_types::Image;

/// Insert a catalog entry unless the filename is already present.
/// Returns whether a row was added.
pub async fn insert_ignore_tx(tx: &mut Transaction<'_, Sqlite>, filename: &str) -> anyhow::Result<bool> {
    let res = sqlx::query(r#"INSERT OR IGNORE INTO images (filename) VALUES (?)"#)
        .bind(filename)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("insert image {}", filename))?;
    Ok(res.rows_affected() == 1)
}

/// Images the user has no contribution for.
pub async fn list_eligible_for_user(db: &SqlitePool, user_id: i64) -> sqlx::Result<Vec<Image>> {
    sqlx::query_as::<_, Image>(
        r#"
        SELECT i.id, i.filename
          FROM images i
          LEFT JOIN contributions c
            ON c.image_id = i.id AND c.user_id = ?
         WHERE c.id IS NULL
         ORDER BY i.id
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn exists(db: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(r#"SELECT EXISTS(SELECT 1 FROM images WHERE id = ?)"#)
        .bind(id)
        .fetch_one(db)
        .await
}

pub async fn count(db: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM images"#)
        .fetch_one(db)
        .await
}
