use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqlitePool;
use tracing::{debug, info, instrument};

use crate::error::{LabelError, LabelResult};
use crate::users::dto::LoginMode;
use crate::users::repo_types::User;

pub(crate) const MAX_NAME_LEN: usize = 64;

/// Trims the claimed display name and checks it against the allowed alphabet.
pub(crate) fn normalize_name(raw: &str) -> LabelResult<String> {
    lazy_static! {
        static ref NAME_RE: Regex = Regex::new(r"^[\p{L}\p{N} _.\-]+$").unwrap();
    }
    let name = raw.trim();
    if name.is_empty() {
        return Err(LabelError::InvalidInput("name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(LabelError::InvalidInput(format!(
            "name longer than {} characters",
            MAX_NAME_LEN
        )));
    }
    if !NAME_RE.is_match(name) {
        return Err(LabelError::InvalidInput(
            "name may contain letters, digits, space, '_', '-' and '.'".into(),
        ));
    }
    Ok(name.to_string())
}

/// Resolves a claimed display name to a user. No credential check.
#[instrument(skip(db))]
pub async fn login(db: &SqlitePool, raw_name: &str, mode: LoginMode) -> LabelResult<User> {
    let name = normalize_name(raw_name)?;
    match mode {
        LoginMode::New => {
            // The unique index settles concurrent registrations of the same name.
            let user = User::create(db, &name).await.map_err(|e| match LabelError::from(e) {
                LabelError::AlreadyExists(_) => LabelError::AlreadyExists(format!("user {:?}", name)),
                other => other,
            })?;
            info!(user_id = user.id, name = %user.name, "user registered");
            Ok(user)
        }
        LoginMode::Returning => {
            let user = User::find_by_name(db, &name)
                .await?
                .ok_or_else(|| LabelError::NotFound(format!("user {:?}", name)))?;
            debug!(user_id = user.id, "user logged in");
            Ok(user)
        }
    }
}

/// Fails with `NotFound` unless the user id is registered.
pub async fn require_user(db: &SqlitePool, user_id: i64) -> LabelResult<User> {
    User::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| LabelError::NotFound(format!("user {}", user_id)))
}
