use async_trait::async_trait;

use breakbread_core::{NewAsset, ObjectStorage, StorageError};

use super::SupabaseConnection;

/// Object storage reached over the Supabase-style storage REST contract
pub struct SupabaseStorage {
    connection: SupabaseConnection,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            connection: SupabaseConnection::new(base_url, anon_key),
        }
    }

    pub(crate) fn from_connection(connection: SupabaseConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        bucket: &str,
        filename: &str,
        asset: NewAsset,
    ) -> Result<String, StorageError> {
        let response = self
            .connection
            .authed(
                self.connection
                    .http
                    .post(self.connection.object_url(bucket, filename)),
            )
            .header("content-type", asset.content_type)
            .header("x-upsert", "true")
            .body(asset.bytes)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed {
                filename: filename.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_else(|_| status.to_string());

            return Err(StorageError::UploadFailed {
                filename: filename.to_string(),
                reason,
            });
        }

        Ok(self.connection.public_object_url(bucket, filename))
    }

    async fn delete(&self, bucket: &str, filename: &str) -> Result<(), StorageError> {
        let response = self
            .connection
            .authed(
                self.connection
                    .http
                    .delete(self.connection.object_url(bucket, filename)),
            )
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed {
                filename: filename.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_else(|_| status.to_string());

            return Err(StorageError::DeleteFailed {
                filename: filename.to_string(),
                reason,
            });
        }

        Ok(())
    }
}
