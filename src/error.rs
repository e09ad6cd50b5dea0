use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Errors surfaced by the labelling operations.
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

pub type LabelResult<T> = Result<T, LabelError>;

impl From<sqlx::Error> for LabelError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return LabelError::AlreadyExists(db.message().to_string());
            }
            if db.is_foreign_key_violation() {
                return LabelError::InvalidReference(db.message().to_string());
            }
        }
        LabelError::Database(e)
    }
}

impl LabelError {
    pub fn status(&self) -> StatusCode {
        match self {
            LabelError::AlreadyExists(_) => StatusCode::CONFLICT,
            LabelError::NotFound(_) => StatusCode::NOT_FOUND,
            LabelError::InvalidReference(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LabelError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LabelError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            LabelError::Storage(_) | LabelError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LabelError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, %status, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
