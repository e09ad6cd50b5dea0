use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Catalog entry. Seeded once, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Image {
    pub id: i64,
    pub filename: String,
}
