use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

/// What happens when a user submits a label (or mask) for an image they already labelled.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResubmitPolicy {
    Overwrite,
    Reject,
}

impl FromStr for ResubmitPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "reject" => Ok(Self::Reject),
            other => anyhow::bail!("unknown RESUBMIT_POLICY {:?} (expected overwrite|reject)", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MaskStorageConfig {
    Local { dir: String, url_prefix: String },
    S3(S3Config),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub image_dir: String,
    pub image_url_prefix: String,
    pub mask_storage: MaskStorageConfig,
    pub resubmit_policy: ResubmitPolicy,
    pub leaderboard_limit: i64,
    pub leaderboard_max: i64,
    pub max_mask_bytes: usize,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

/// Unset falls back to `default`; set but unparsable is an error.
fn env_parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid {} {:?}", key, raw)),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(e).with_context(|| format!("read {}", key)),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env_or("DATABASE_URL", "sqlite://eelgrass.db?mode=rwc");

        let mask_storage = match env_or("MASK_STORAGE", "local").to_ascii_lowercase().as_str() {
            "local" => MaskStorageConfig::Local {
                dir: env_or("MASK_DIR", "masks"),
                url_prefix: env_or("MASK_URL_PREFIX", "/masks"),
            },
            "s3" => MaskStorageConfig::S3(S3Config {
                endpoint: std::env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT")?,
                bucket: std::env::var("MINIO_BUCKET").context("MINIO_BUCKET")?,
                access_key: std::env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY")?,
                secret_key: std::env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY")?,
                region: env_or("MINIO_REGION", "us-east-1"),
            }),
            other => anyhow::bail!("unknown MASK_STORAGE {:?} (expected local|s3)", other),
        };

        let resubmit_policy = env_or("RESUBMIT_POLICY", "overwrite").parse()?;

        let leaderboard_max = env_parsed("LEADERBOARD_MAX", 100_i64)?.max(1);
        let leaderboard_limit = env_parsed("LEADERBOARD_LIMIT", 10_i64)?.clamp(1, leaderboard_max);

        Ok(Self {
            host: env_or("APP_HOST", "0.0.0.0"),
            port: env_parsed("APP_PORT", 8080_u16)?,
            database_url,
            image_dir: env_or("IMAGE_DIR", "images"),
            image_url_prefix: env_or("IMAGE_URL_PREFIX", "/images"),
            mask_storage,
            resubmit_policy,
            leaderboard_limit,
            leaderboard_max,
            max_mask_bytes: env_parsed("MAX_MASK_BYTES", 10 * 1024 * 1024)?,
        })
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn resubmit_policy_parses_case_insensitive() {
        assert_eq!("overwrite".parse::<ResubmitPolicy>().unwrap(), ResubmitPolicy::Overwrite);
        assert_eq!(" Reject ".parse::<ResubmitPolicy>().unwrap(), ResubmitPolicy::Reject);
    }

    #[test]
    fn numeric_env_falls_back_only_when_unset() {
        std::env::remove_var("EELGRASS_TEST_UNSET_LIMIT");
        assert_eq!(env_parsed("EELGRASS_TEST_UNSET_LIMIT", 10_i64).unwrap(), 10);

        std::env::set_var("EELGRASS_TEST_GOOD_LIMIT", " 25 ");
        assert_eq!(env_parsed("EELGRASS_TEST_GOOD_LIMIT", 10_i64).unwrap(), 25);

        std::env::set_var("EELGRASS_TEST_BAD_LIMIT", "ten");
        let err = env_parsed("EELGRASS_TEST_BAD_LIMIT", 10_i64).unwrap_err();
        assert!(err.to_string().contains("EELGRASS_TEST_BAD_LIMIT"), "{err}");

        std::env::set_var("EELGRASS_TEST_BAD_BYTES", "-1");
        assert!(env_parsed("EELGRASS_TEST_BAD_BYTES", 1024_usize).is_err());
    }

    #[test]
    fn resubmit_policy_rejects_unknown_value() {
        let err = "merge".parse::<ResubmitPolicy>().unwrap_err();
        assert!(err.to_string().contains("RESUBMIT_POLICY"));
    }
}
