use async_trait::async_trait;
use thiserror::Error;

use crate::NewAsset;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload of {filename} failed: {reason}")]
    UploadFailed { filename: String, reason: String },
    #[error("Deletion of {filename} failed: {reason}")]
    DeleteFailed { filename: String, reason: String },
    /// An unknown or internal error happened in the storage service
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Represents a type that can store binary assets in named buckets.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Uploads an object and returns its publicly reachable url
    async fn upload(
        &self,
        bucket: &str,
        filename: &str,
        asset: NewAsset,
    ) -> Result<String, StorageError>;

    /// Deletes an object by filename
    async fn delete(&self, bucket: &str, filename: &str) -> Result<(), StorageError>;
}
