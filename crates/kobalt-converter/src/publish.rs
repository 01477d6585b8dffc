//! Optional hand-off of the finished file to object storage.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use kobalt_models::JobId;
use kobalt_storage::{output_key, S3Storage, StorageResult};

/// Makes a finished conversion retrievable and returns its URL.
#[async_trait]
pub trait OutputPublisher: Send + Sync {
    async fn publish(&self, job_id: &JobId, title: &str, path: &Path) -> StorageResult<String>;
}

/// Uploads to S3 and hands out a presigned GET URL.
#[derive(Clone)]
pub struct S3Publisher {
    storage: S3Storage,
    expiry: Duration,
}

impl S3Publisher {
    pub fn new(storage: S3Storage, expiry: Duration) -> Self {
        Self { storage, expiry }
    }
}

#[async_trait]
impl OutputPublisher for S3Publisher {
    async fn publish(&self, job_id: &JobId, title: &str, path: &Path) -> StorageResult<String> {
        let key = output_key(job_id.as_str(), title);
        self.storage.upload_and_presign(path, &key, self.expiry).await
    }
}
