use async_trait::async_trait;
use thiserror::Error;

use crate::{
    Credentials, NewProfile, NewRegistration, NewTable, NewTableMember, ProfileData, SessionData,
    TableData, TableMemberData, UpdatedProfile, UpdatedTable,
};

pub type BackendResult<T> = Result<T, BackendError>;
pub type BoxedBackend = Box<dyn Backend>;

#[derive(Debug, Error)]
pub enum BackendError {
    /// An unknown or internal error happened in the backend service
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// The request never produced a usable response
    #[error("Request failed: {0}")]
    Network(String),
    /// The caller is not allowed to perform this operation
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    /// A record already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The record collection in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A record doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Represents a type that can reach the Break Bread backend service.
///
/// Operations never retry internally and assume no ordering across calls;
/// callers sequence multi-step flows themselves. Implementations are
/// responsible for attaching the session credential to subsequent requests
/// after a successful `sign_in`, `sign_up` or `session_user`.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn sign_up(&self, new_registration: NewRegistration) -> BackendResult<SessionData>;
    async fn sign_in(&self, credentials: Credentials) -> BackendResult<SessionData>;
    async fn sign_out(&self, token: &str) -> BackendResult<()>;
    async fn session_user(&self, token: &str) -> BackendResult<SessionData>;

    async fn list_tables(&self) -> BackendResult<Vec<TableData>>;
    async fn table_by_id(&self, table_id: &str) -> BackendResult<TableData>;
    async fn table_by_invite_code(&self, invite_code: &str) -> BackendResult<TableData>;
    async fn create_table(&self, new_table: NewTable) -> BackendResult<TableData>;
    async fn update_table(&self, updated_table: UpdatedTable) -> BackendResult<TableData>;
    async fn delete_table(&self, table_id: &str) -> BackendResult<()>;
    async fn count_tables_by_creator(&self, creator_id: &str) -> BackendResult<u64>;

    async fn list_members(&self, table_id: &str) -> BackendResult<Vec<TableMemberData>>;
    async fn create_member(&self, new_member: NewTableMember) -> BackendResult<TableMemberData>;
    async fn delete_member(&self, table_id: &str, user_id: &str) -> BackendResult<()>;

    async fn profile_by_id(&self, profile_id: &str) -> BackendResult<ProfileData>;
    async fn upsert_profile(&self, new_profile: NewProfile) -> BackendResult<ProfileData>;
    async fn update_profile(&self, updated_profile: UpdatedProfile) -> BackendResult<ProfileData>;
}

impl BackendError {
    /// Returns true when the backend rejected the session credential itself,
    /// meaning a cached token should be discarded rather than reused
    pub fn invalidates_session(&self) -> bool {
        matches!(
            self,
            BackendError::Unauthorized(_)
                | BackendError::NotFound {
                    resource: "session",
                    ..
                }
        )
    }
}
