use serde::{Deserialize, Serialize};

/// `new` registers the name, `returning` looks it up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoginMode {
    #[serde(alias = "New")]
    New,
    #[serde(alias = "Returning")]
    Returning,
}

/// Form body for `POST /login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub mode: LoginMode,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub name: String,
}
