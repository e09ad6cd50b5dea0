use sqlx::{SqliteConnection, SqlitePool};
use time::OffsetDateTime;

use crate::config::ResubmitPolicy;
use crate::contributions::repo_types::Contribution;

pub async fn find(db: &SqlitePool, user_id: i64, image_id: i64) -> sqlx::Result<Option<Contribution>> {
    sqlx::query_as::<_, Contribution>(
        r#"
        SELECT id, user_id, image_id, label, mask_path, created_at, updated_at
          FROM contributions
         WHERE user_id = ? AND image_id = ?
        "#,
    )
    .bind(user_id)
    .bind(image_id)
    .fetch_optional(db)
    .await
}

/// Insert-or-update the label. Under `Reject` an existing label is left alone
/// and `false` is returned.
pub async fn upsert_label(
    db: &SqlitePool,
    user_id: i64,
    image_id: i64,
    label: &str,
    policy: ResubmitPolicy,
) -> sqlx::Result<bool> {
    let sql = match policy {
        ResubmitPolicy::Overwrite => {
            r#"
            INSERT INTO contributions (user_id, image_id, label, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT (user_id, image_id) DO UPDATE
               SET label = excluded.label,
                   updated_at = excluded.updated_at
            "#
        }
        ResubmitPolicy::Reject => {
            r#"
            INSERT INTO contributions (user_id, image_id, label, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT (user_id, image_id) DO UPDATE
               SET label = excluded.label,
                   updated_at = excluded.updated_at
             WHERE contributions.label IS NULL
            "#
        }
    };
    let res = sqlx::query(sql)
        .bind(user_id)
        .bind(image_id)
        .bind(label)
        .bind(OffsetDateTime::now_utc())
        .execute(db)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn mask_path(
    conn: &mut SqliteConnection,
    user_id: i64,
    image_id: i64,
) -> sqlx::Result<Option<String>> {
    let row: Option<Option<String>> = sqlx::query_scalar(
        r#"SELECT mask_path FROM contributions WHERE user_id = ? AND image_id = ?"#,
    )
    .bind(user_id)
    .bind(image_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.flatten())
}

/// Insert-or-update the mask reference. Same `Reject` semantics as [`upsert_label`].
pub async fn upsert_mask(
    conn: &mut SqliteConnection,
    user_id: i64,
    image_id: i64,
    mask_path: &str,
    policy: ResubmitPolicy,
) -> sqlx::Result<bool> {
    let sql = match policy {
        ResubmitPolicy::Overwrite => {
            r#"
            INSERT INTO contributions (user_id, image_id, mask_path, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT (user_id, image_id) DO UPDATE
               SET mask_path = excluded.mask_path,
                   updated_at = excluded.updated_at
            "#
        }
        ResubmitPolicy::Reject => {
            r#"
            INSERT INTO contributions (user_id, image_id, mask_path, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT (user_id, image_id) DO UPDATE
               SET mask_path = excluded.mask_path,
                   updated_at = excluded.updated_at
             WHERE contributions.mask_path IS NULL
            "#
        }
    };
    let res = sqlx::query(sql)
        .bind(user_id)
        .bind(image_id)
        .bind(mask_path)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *conn)
        .await?;
    Ok(res.rows_affected() == 1)
}
