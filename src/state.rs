use crate::config::AppConfig;
use crate::storage::{self, StorageClient};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = crate::db::connect(&config.database_url).await?;
        let storage = storage::from_config(&config.mask_storage).await?;

        Ok(Self::from_parts(db, config, storage))
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>, storage: Arc<dyn StorageClient>) -> Self {
        Self {
            db,
            config,
            storage,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::{MaskStorageConfig, ResubmitPolicy};
    use crate::storage::LocalStorage;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicBool, Ordering};

    pub fn test_config(policy: ResubmitPolicy) -> AppConfig {
        AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: "sqlite::memory:".into(),
            image_dir: "images".into(),
            image_url_prefix: "/images".into(),
            mask_storage: MaskStorageConfig::Local {
                dir: "masks".into(),
                url_prefix: "/masks".into(),
            },
            resubmit_policy: policy,
            leaderboard_limit: 10,
            leaderboard_max: 100,
            max_mask_bytes: 1024 * 1024,
        }
    }

    /// In-memory database plus a throwaway mask directory. Keep the `TempDir` alive.
    pub async fn state_with(policy: ResubmitPolicy) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path(), "/masks").await.expect("local storage");
        let state = AppState::from_parts(
            crate::db::memory_pool().await,
            Arc::new(test_config(policy)),
            Arc::new(storage),
        );
        (state, dir)
    }

    /// File-backed database with a full-size pool, masks under `<tempdir>/masks`.
    pub async fn file_state_with(policy: ResubmitPolicy) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("eelgrass.db").display());
        let db = crate::db::connect(&url).await.expect("file pool");
        crate::db::migrate(&db).await.expect("migrations");
        let storage = LocalStorage::new(dir.path().join("masks"), "/masks")
            .await
            .expect("local storage");
        let state = AppState::from_parts(db, Arc::new(test_config(policy)), Arc::new(storage));
        (state, dir)
    }

    pub async fn state() -> (AppState, tempfile::TempDir) {
        state_with(ResubmitPolicy::Overwrite).await
    }

    /// Wraps local storage and fails `put_object` while `fail_puts` is set.
    pub struct FlakyStorage {
        pub inner: LocalStorage,
        pub fail_puts: AtomicBool,
    }

    #[async_trait]
    impl StorageClient for FlakyStorage {
        async fn put_object(&self, key: &str, body: Bytes, ct: &str) -> anyhow::Result<()> {
            if self.fail_puts.load(Ordering::SeqCst) {
                anyhow::bail!("disk full");
            }
            self.inner.put_object(key, body, ct).await
        }
        async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
            self.inner.delete_object(key).await
        }
        async fn url_for(&self, key: &str) -> anyhow::Result<String> {
            self.inner.url_for(key).await
        }
    }

    pub async fn seed_images(state: &AppState, names: &[&str]) -> Vec<i64> {
        let mut ids = Vec::new();
        for n in names {
            let id: i64 = sqlx::query_scalar("INSERT INTO images (filename) VALUES (?) RETURNING id")
                .bind(*n)
                .fetch_one(&state.db)
                .await
                .expect("insert image");
            ids.push(id);
        }
        ids
    }
}
