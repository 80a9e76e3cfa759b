mod members;

pub use members::*;

use crossbeam::atomic::AtomicCell;
use dashmap::DashMap;
use log::info;
use parking_lot::Mutex;
use thiserror::Error;

use breakbread_core::{
    invite_code, is_valid_invite_code, Backend, BackendError, ClientEvent, NewAsset, NewTable,
    NewTableMember, ObjectStorage, RecordId, SessionData, StorageError, TableData, UpdatedTable,
};

use crate::auth::SessionHandle;
use crate::{AssetManager, ClientContext};

/// Maintains the authoritative local copy of the tables collection and
/// applies mutations against the backend.
///
/// Every successful mutation reconciles by refetching the full collection,
/// so the rendered list never diverges from a write for longer than one
/// reconciliation cycle.
pub struct TableManager<Db, St> {
    context: ClientContext<Db, St>,
    session: SessionHandle,
    assets: AssetManager<St>,

    /// Newest-first snapshot of the remote collection
    tables: Mutex<Vec<TableData>>,
    /// Records with a mutation currently in flight
    busy: DashMap<RecordId, ()>,
    /// Guards against double-submitting a create
    creating: AtomicCell<bool>,
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Table name cannot be empty")]
    EmptyName,
    #[error("Invite code is not valid")]
    InvalidInviteCode,
    #[error("You must be logged in to do this")]
    NotLoggedIn,
    #[error("Only the table creator can do this")]
    NotCreator,
    #[error("The creator cannot leave their own table")]
    CreatorCannotLeave,
    /// The table is not in the local snapshot
    #[error("Table is not known")]
    UnknownTable,
    /// The same action was submitted again before the first finished
    #[error("This action is already in progress")]
    AlreadyInProgress,
    #[error("Table image could not be stored: {0}")]
    Asset(#[from] StorageError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Input for a new table
#[derive(Debug, Default)]
pub struct NewTableRequest {
    pub name: String,
    pub image: Option<NewAsset>,
}

/// Input for editing a table; creator only
#[derive(Debug, Default)]
pub struct UpdateTableRequest {
    pub table_id: RecordId,
    pub name: Option<String>,
    pub image: Option<NewAsset>,
    pub last_order: Option<String>,
}

impl<Db, St> TableManager<Db, St>
where
    Db: Backend,
    St: ObjectStorage,
{
    pub fn new(context: &ClientContext<Db, St>, session: SessionHandle) -> Self {
        Self {
            context: context.clone(),
            session,
            assets: AssetManager::new(&context.storage, context.config.clone()),
            tables: Default::default(),
            busy: Default::default(),
            creating: AtomicCell::new(false),
        }
    }

    /// Refetches the authoritative collection, replacing local state
    pub async fn refresh(&self) -> Result<Vec<TableData>, TableError> {
        let mut tables = self.context.backend.list_tables().await?;
        tables.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        *self.tables.lock() = tables.clone();
        self.context.emit(ClientEvent::TablesUpdated {
            tables: tables.clone(),
        });

        Ok(tables)
    }

    /// The local newest-first snapshot
    pub fn tables(&self) -> Vec<TableData> {
        self.tables.lock().clone()
    }

    pub fn table_by_id(&self, table_id: &str) -> Option<TableData> {
        self.tables
            .lock()
            .iter()
            .find(|table| table.id == table_id)
            .cloned()
    }

    /// Returns true if the signed-in user created the given table.
    /// Screens use this to decide which affordances to expose.
    pub fn is_creator(&self, table: &TableData) -> bool {
        self.session
            .current()
            .map(|session| session.user.id == table.creator_id)
            .unwrap_or(false)
    }

    pub async fn create_table(&self, new_table: NewTableRequest) -> Result<TableData, TableError> {
        let session = self.require_user()?;

        let name = new_table.name.trim().to_string();
        if name.is_empty() {
            return Err(TableError::EmptyName);
        }

        let _guard =
            CreateGuard::acquire(&self.creating).ok_or(TableError::AlreadyInProgress)?;

        // The upload must fully succeed before the record write is attempted
        let image = match new_table.image {
            Some(asset) => self.assets.store_table_image(&session.user.id, asset).await?,
            None => self.assets.default_table_image(),
        };

        let created = self
            .context
            .backend
            .create_table(NewTable {
                name,
                invite_code: invite_code(self.context.config.invite_code_length),
                creator_id: session.user.id,
                image,
                last_order: None,
            })
            .await?;

        info!("Table {} created", created.name);
        self.context.emit(ClientEvent::TableCreated {
            table: created.clone(),
        });

        self.refresh().await?;

        Ok(created)
    }

    pub async fn update_table(&self, update: UpdateTableRequest) -> Result<TableData, TableError> {
        let session = self.require_user()?;
        let existing = self
            .table_by_id(&update.table_id)
            .ok_or(TableError::UnknownTable)?;

        if existing.creator_id != session.user.id {
            return Err(TableError::NotCreator);
        }

        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(TableError::EmptyName);
            }
        }

        let _guard = self.busy_guard(&update.table_id)?;

        // A replacement banner is uploaded before the record is touched
        let new_image = match update.image {
            Some(asset) => Some(self.assets.store_table_image(&session.user.id, asset).await?),
            None => None,
        };

        let updated = self
            .context
            .backend
            .update_table(UpdatedTable {
                id: update.table_id,
                name: update.name.map(|name| name.trim().to_string()),
                image: new_image.clone(),
                last_order: update.last_order,
            })
            .await?;

        // The previous banner is deleted only now that the record points at
        // the new one
        if let Some(new_image) = &new_image {
            if let Some(old) = &existing.image {
                self.assets.remove_replaced_table_image(old, new_image).await;
            }
        }

        self.refresh().await?;

        Ok(updated)
    }

    pub async fn delete_table(&self, table_id: &str) -> Result<(), TableError> {
        let session = self.require_user()?;
        let existing = self.table_by_id(table_id).ok_or(TableError::UnknownTable)?;

        // Authorization short-circuit: non-creators never reach the network
        if existing.creator_id != session.user.id {
            return Err(TableError::NotCreator);
        }

        let _guard = self.busy_guard(table_id)?;

        self.context.backend.delete_table(table_id).await?;

        // Best-effort: the record is gone either way
        if let Some(image) = &existing.image {
            self.assets.remove_table_image(image).await;
        }

        info!("Table {} deleted", existing.name);
        self.context.emit(ClientEvent::TableDeleted {
            table_id: table_id.to_string(),
        });

        self.refresh().await?;

        Ok(())
    }

    /// Removes the signed-in user's membership row. The table itself
    /// persists and stays visible to everyone else.
    pub async fn leave_table(&self, table_id: &str) -> Result<(), TableError> {
        let session = self.require_user()?;
        let existing = self.table_by_id(table_id).ok_or(TableError::UnknownTable)?;

        if existing.creator_id == session.user.id {
            return Err(TableError::CreatorCannotLeave);
        }

        let _guard = self.busy_guard(table_id)?;

        self.context
            .backend
            .delete_member(table_id, &session.user.id)
            .await?;

        self.context.emit(ClientEvent::MemberLeft {
            table_id: table_id.to_string(),
            user_id: session.user.id,
        });

        self.refresh().await?;

        Ok(())
    }

    /// Joins a table by its shared invite code
    pub async fn join_by_invite_code(&self, code: &str) -> Result<TableData, TableError> {
        let session = self.require_user()?;

        let code = code.trim().to_uppercase();
        if !is_valid_invite_code(&code, self.context.config.invite_code_length) {
            return Err(TableError::InvalidInviteCode);
        }

        let table = self.context.backend.table_by_invite_code(&code).await?;

        // Snapshot the display name so rosters stay readable
        let username = self
            .context
            .backend
            .profile_by_id(&session.user.id)
            .await
            .ok()
            .map(|profile| profile.full_name);

        let member = self
            .context
            .backend
            .create_member(NewTableMember {
                table_id: table.id.clone(),
                user_id: session.user.id,
                username,
            })
            .await?;

        info!("Joined table {}", table.name);
        self.context.emit(ClientEvent::MemberJoined {
            table_id: table.id.clone(),
            member,
        });

        self.refresh().await?;

        Ok(table)
    }

    /// The display roster for a table, creator first
    pub async fn members(&self, table_id: &str) -> Result<Vec<MemberView>, TableError> {
        let table = match self.table_by_id(table_id) {
            Some(table) => table,
            None => self.context.backend.table_by_id(table_id).await?,
        };

        let members = self.context.backend.list_members(table_id).await?;
        let creator_name = self
            .context
            .backend
            .profile_by_id(&table.creator_id)
            .await
            .ok()
            .map(|profile| profile.full_name);

        Ok(assemble_roster(&table, creator_name, members))
    }

    fn require_user(&self) -> Result<SessionData, TableError> {
        self.session.current().ok_or(TableError::NotLoggedIn)
    }

    fn busy_guard(&self, table_id: &str) -> Result<BusyGuard<'_>, TableError> {
        BusyGuard::acquire(&self.busy, table_id).ok_or(TableError::AlreadyInProgress)
    }
}

/// Releases the create flag when the operation completes
struct CreateGuard<'a>(&'a AtomicCell<bool>);

impl<'a> CreateGuard<'a> {
    fn acquire(flag: &'a AtomicCell<bool>) -> Option<Self> {
        if flag.swap(true) {
            return None;
        }

        Some(Self(flag))
    }
}

impl Drop for CreateGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false);
    }
}

/// Releases the per-record busy marker when the operation completes
struct BusyGuard<'a> {
    busy: &'a DashMap<RecordId, ()>,
    table_id: RecordId,
}

impl<'a> BusyGuard<'a> {
    fn acquire(busy: &'a DashMap<RecordId, ()>, table_id: &str) -> Option<Self> {
        if busy.insert(table_id.to_string(), ()).is_some() {
            return None;
        }

        Some(Self {
            busy,
            table_id: table_id.to_string(),
        })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.remove(&self.table_id);
    }
}
