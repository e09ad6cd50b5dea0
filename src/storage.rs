use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;

use crate::config::{MaskStorageConfig, S3Config};

/// Blob area for uploaded masks. Keys are flat generated names.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    async fn url_for(&self, key: &str) -> anyhow::Result<String>;
}

pub async fn from_config(cfg: &MaskStorageConfig) -> anyhow::Result<Arc<dyn StorageClient>> {
    let storage = match cfg {
        MaskStorageConfig::Local { dir, url_prefix } => {
            Arc::new(LocalStorage::new(dir, url_prefix).await?) as Arc<dyn StorageClient>
        }
        MaskStorageConfig::S3(s3) => Arc::new(S3Storage::new(s3).await?) as Arc<dyn StorageClient>,
    };
    Ok(storage)
}

/// Masks written to a local directory.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
    url_prefix: String,
}

impl LocalStorage {
    pub async fn new(root: impl AsRef<Path>, url_prefix: &str) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create mask dir {}", root.display()))?;
        Ok(Self {
            root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        })
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        anyhow::ensure!(
            !key.is_empty() && !key.contains(['/', '\\']) && key != "." && key != "..",
            "invalid object key {:?}",
            key
        );
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        // Write under a temp name first so a half-written file never carries the final key.
        let tmp = self.root.join(format!(".{}.part", key));
        tokio::fs::write(&tmp, &body)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("rename into {}", path.display()));
        }
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }

    async fn url_for(&self, key: &str) -> anyhow::Result<String> {
        self.path_for(key)?;
        Ok(format!("{}/{}", self.url_prefix, key))
    }
}

/// S3 / MinIO bucket.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    const PRESIGN_TTL_SECS: u64 = 30 * 60;

    /// Path-style addressing so MinIO endpoints work without bucket DNS.
    pub async fn new(cfg: &S3Config) -> anyhow::Result<Self> {
        anyhow::ensure!(!cfg.bucket.is_empty(), "MINIO_BUCKET must not be empty");
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for S3Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("s3 put_object {}/{}", self.bucket, key))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("s3 delete_object {}/{}", self.bucket, key))?;
        Ok(())
    }

    /// Masks are private objects; hand out a short-lived presigned GET.
    async fn url_for(&self, key: &str) -> anyhow::Result<String> {
        let ttl = PresigningConfig::expires_in(std::time::Duration::from_secs(Self::PRESIGN_TTL_SECS))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(ttl)
            .await
            .with_context(|| format!("presign mask {}", key))?;
        Ok(presigned.uri().to_string())
    }
}

/// Maps an upload content type to the extension used in generated mask names.
pub fn ext_from_mime(ct: &str) -> &'static str {
    match ct {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}
