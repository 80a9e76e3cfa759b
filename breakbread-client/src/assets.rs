use std::sync::Arc;

use log::warn;

use breakbread_core::{unique_filename, Config, ImageRef, NewAsset, ObjectStorage, StorageError};

/// Manages the lifecycle of uploaded images relative to their owning records:
/// upload on create, replace on edit, best-effort delete on record delete.
pub struct AssetManager<St> {
    storage: Arc<St>,
    config: Config,
}

impl<St> AssetManager<St>
where
    St: ObjectStorage,
{
    pub fn new(storage: &Arc<St>, config: Config) -> Self {
        Self {
            storage: storage.clone(),
            config,
        }
    }

    /// Uploads a table banner, returning its durable reference.
    /// Callers must not write a record referencing the image unless this
    /// succeeded.
    pub async fn store_table_image(
        &self,
        owner_id: &str,
        asset: NewAsset,
    ) -> Result<ImageRef, StorageError> {
        let filename = unique_filename(owner_id, &asset.extension);
        let url = self
            .storage
            .upload(&self.config.table_image_bucket, &filename, asset)
            .await?;

        Ok(ImageRef::uploaded(url, filename))
    }

    /// The image assigned when no banner is supplied at creation.
    /// It carries no filename, which marks it as never deletable.
    pub fn default_table_image(&self) -> ImageRef {
        ImageRef::placeholder(self.config.default_table_image_url.clone())
    }

    /// Uploads a profile avatar, returning its public url
    pub async fn store_avatar(
        &self,
        owner_id: &str,
        asset: NewAsset,
    ) -> Result<String, StorageError> {
        let filename = unique_filename(owner_id, &asset.extension);

        self.storage
            .upload(&self.config.avatar_bucket, &filename, asset)
            .await
    }

    /// Best-effort removal of a table banner. Placeholders are skipped and
    /// failures are logged, never propagated.
    pub async fn remove_table_image(&self, image: &ImageRef) {
        let Some(filename) = image.filename() else {
            return;
        };

        if let Err(e) = self
            .storage
            .delete(&self.config.table_image_bucket, filename)
            .await
        {
            warn!(
                "Orphaned asset {}/{}: {}",
                self.config.table_image_bucket, filename, e
            );
        }
    }

    /// Removes a replaced banner, to be called only once the owning record
    /// points at the new one. Skipped when the filenames are the same.
    pub async fn remove_replaced_table_image(&self, old: &ImageRef, new: &ImageRef) {
        if old.is_deletable() && old.filename() != new.filename() {
            self.remove_table_image(old).await;
        }
    }
}
