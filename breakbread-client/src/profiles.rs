use log::warn;
use thiserror::Error;

use breakbread_core::{
    Backend, BackendError, ClientEvent, NewAsset, ObjectStorage, ProfileData, SessionData,
    StorageError, UpdatedProfile,
};

use crate::auth::SessionHandle;
use crate::{AssetManager, ClientContext};

/// Loads and mutates the signed-in user's profile.
pub struct ProfileManager<Db, St> {
    context: ClientContext<Db, St>,
    session: SessionHandle,
    assets: AssetManager<St>,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Full name cannot be empty")]
    EmptyName,
    #[error("You must be logged in to do this")]
    NotLoggedIn,
    #[error("Avatar could not be stored: {0}")]
    Asset(#[from] StorageError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// A profile together with its derived counters
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileView {
    pub profile: ProfileData,
    /// Counted from the tables collection, never stored on the profile
    pub tables_created: u64,
}

impl<Db, St> ProfileManager<Db, St>
where
    Db: Backend,
    St: ObjectStorage,
{
    pub fn new(context: &ClientContext<Db, St>, session: SessionHandle) -> Self {
        Self {
            context: context.clone(),
            session,
            assets: AssetManager::new(&context.storage, context.config.clone()),
        }
    }

    /// The signed-in user's profile with derived counters
    pub async fn load(&self) -> Result<ProfileView, ProfileError> {
        let session = self.require_user()?;

        let profile = self.context.backend.profile_by_id(&session.user.id).await?;

        // The profile still renders when only the counter query fails
        let tables_created = match self
            .context
            .backend
            .count_tables_by_creator(&session.user.id)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to count created tables: {}", e);
                0
            }
        };

        Ok(ProfileView {
            profile,
            tables_created,
        })
    }

    /// Renames the signed-in user
    pub async fn update_name(&self, full_name: &str) -> Result<ProfileData, ProfileError> {
        let session = self.require_user()?;

        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(ProfileError::EmptyName);
        }

        let updated = self
            .context
            .backend
            .update_profile(UpdatedProfile {
                id: session.user.id,
                full_name: Some(full_name.to_string()),
                avatar_url: None,
            })
            .await?;

        self.context.emit(ClientEvent::ProfileUpdated {
            profile: updated.clone(),
        });

        Ok(updated)
    }

    /// Uploads a new avatar and points the profile at it.
    /// The upload must fully succeed before the profile row is touched.
    pub async fn set_avatar(&self, asset: NewAsset) -> Result<ProfileData, ProfileError> {
        let session = self.require_user()?;

        let avatar_url = self.assets.store_avatar(&session.user.id, asset).await?;

        let updated = self
            .context
            .backend
            .update_profile(UpdatedProfile {
                id: session.user.id,
                full_name: None,
                avatar_url: Some(avatar_url),
            })
            .await?;

        self.context.emit(ClientEvent::ProfileUpdated {
            profile: updated.clone(),
        });

        Ok(updated)
    }

    fn require_user(&self) -> Result<SessionData, ProfileError> {
        self.session.current().ok_or(ProfileError::NotLoggedIn)
    }
}
