use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct UserStats {
    pub user_id: i64,
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}
