//! S3 client implementation.

use std::path::Path;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Region used when `AWS_REGION` is unset.
pub const DEFAULT_REGION: &str = "eu-north-1";

/// Longest title fragment kept in an object key.
const MAX_KEY_TITLE_LEN: usize = 100;

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket name
    pub bucket: String,
    /// Region
    pub region: String,
    /// Custom endpoint for S3-compatible stores
    pub endpoint_url: Option<String>,
    /// Static access key; the default provider chain is used when absent
    pub access_key_id: Option<String>,
    /// Static secret key
    pub secret_access_key: Option<String>,
}

impl S3Config {
    /// Create config from environment variables.
    ///
    /// Returns `None` when `S3_BUCKET` is not set.
    pub fn from_env() -> Option<Self> {
        let bucket = std::env::var("S3_BUCKET").ok().filter(|b| !b.trim().is_empty())?;

        Some(Self {
            bucket,
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string()),
            endpoint_url: std::env::var("S3_ENDPOINT_URL").ok(),
            access_key_id: std::env::var("S3_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY").ok(),
        })
    }

    fn static_credentials(&self) -> Option<Credentials> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some(Credentials::new(id, secret, None, None, "kobalt")),
            _ => None,
        }
    }
}

/// S3 storage client.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Create a new client from configuration.
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        if config.bucket.trim().is_empty() {
            return Err(StorageError::config_error("bucket name is empty"));
        }

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = Builder::from(&shared);
        if let Some(credentials) = config.static_credentials() {
            builder = builder.credentials_provider(credentials);
        }
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        info!(bucket = %config.bucket, region = %config.region, "S3 upload enabled");

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket,
        })
    }

    /// Create from environment variables, if upload is configured.
    pub async fn from_env() -> StorageResult<Option<Self>> {
        match S3Config::from_env() {
            Some(config) => Ok(Some(Self::new(config).await?)),
            None => Ok(None),
        }
    }

    /// Upload a file.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}", path.display(), key);
        Ok(())
    }

    /// Generate a presigned GET URL.
    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    /// Upload an MP3 file and return a presigned URL to it.
    pub async fn upload_and_presign(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        if key.is_empty() || key.starts_with('/') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        self.upload_file(path, key, "audio/mpeg").await?;
        self.presign_get(key, expires_in).await
    }
}

/// Object key for a finished conversion: `<job id>/<sanitized title>.mp3`.
pub fn output_key(job_id: &str, title: &str) -> String {
    let mut name: String = title
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_alphanumeric() => Some(c),
            '-' | '_' | '.' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .take(MAX_KEY_TITLE_LEN)
        .collect();

    // Leading dots would produce hidden or relative-looking names
    while name.starts_with('.') {
        name.remove(0);
    }
    if name.is_empty() {
        name.push_str("audio");
    }

    format!("{}/{}.mp3", job_id, name)
}
