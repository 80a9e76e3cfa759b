//! In-memory doubles for the gateway traits, with failure injection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use crossbeam::atomic::AtomicCell;
use crossbeam::channel::unbounded;
use parking_lot::Mutex;

use breakbread_core::{
    invite_code, AuthUser, Backend, BackendError, BackendResult, Coordinates, Credentials,
    EventReceiver, LocationError, LocationProvider, NewAsset, NewProfile, NewRegistration,
    NewTable, NewTableMember, ObjectStorage, PlaceData, PlacesError, PlacesGateway, ProfileData,
    SessionData, SessionStore, StorageError, TableData, TableMemberData, UpdatedProfile,
    UpdatedTable,
};

pub(crate) use breakbread_core::Config;

use crate::{Auth, ClientContext, ProfileManager, TableManager};

/// Wires managers to in-memory collaborators for a test
pub(crate) struct TestHarness {
    pub backend: Arc<MemoryBackend>,
    pub storage: Arc<MemoryStorage>,
    pub session_store: Arc<TestSessionStore>,
    pub context: ClientContext<MemoryBackend, MemoryStorage>,
    pub events: EventReceiver,
    auth: Auth<MemoryBackend>,
}

impl TestHarness {
    pub fn new() -> Self {
        let (event_sender, events) = unbounded();

        let backend = Arc::new(MemoryBackend::new());
        let storage = Arc::new(MemoryStorage::new());
        let session_store = Arc::new(TestSessionStore::default());

        let context = ClientContext {
            config: Config::default(),
            backend: backend.clone(),
            storage: storage.clone(),
            event_sender,
        };

        let auth = Auth::new(&context, session_store.clone());

        Self {
            backend,
            storage,
            session_store,
            context,
            events,
            auth,
        }
    }

    /// Restores a seeded user's session and forgets the setup calls
    pub async fn logged_in(self, user_id: &str) -> Self {
        self.session_store.store(&format!("token-{}", user_id));
        self.auth
            .restore()
            .await
            .expect("seeded session restores")
            .expect("seeded session exists");
        self.backend.clear_calls();

        self
    }

    pub fn auth(&self) -> &Auth<MemoryBackend> {
        &self.auth
    }

    pub fn tables(&self) -> TableManager<MemoryBackend, MemoryStorage> {
        TableManager::new(&self.context, self.auth.session())
    }

    pub fn profiles(&self) -> ProfileManager<MemoryBackend, MemoryStorage> {
        ProfileManager::new(&self.context, self.auth.session())
    }
}

struct TestUser {
    email: String,
    password: String,
    token: String,
    user: AuthUser,
}

/// An in-memory backend seeded with two users:
/// user-1 (ada@example.com) and user-2 (bob@example.com), password hunter2,
/// tokens token-user-1 and token-user-2.
pub(crate) struct MemoryBackend {
    users: Mutex<Vec<TestUser>>,
    tables: Mutex<Vec<TableData>>,
    members: Mutex<Vec<TableMemberData>>,
    profiles: Mutex<Vec<ProfileData>>,

    calls: Mutex<Vec<String>>,
    sequence: AtomicCell<i64>,
    base_time: DateTime<Utc>,

    /// When set, mutating calls fail with a network error
    pub fail_writes: AtomicCell<bool>,
    /// When set, mutating calls yield briefly before completing
    pub delay_writes: AtomicCell<bool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let seeded = Self {
            users: Default::default(),
            tables: Default::default(),
            members: Default::default(),
            profiles: Default::default(),
            calls: Default::default(),
            sequence: AtomicCell::new(0),
            base_time: Utc::now(),
            fail_writes: AtomicCell::new(false),
            delay_writes: AtomicCell::new(false),
        };

        seeded.seed_user("user-1", "ada@example.com", "Ada Lovelace");
        seeded.seed_user("user-2", "bob@example.com", "Bob Burger");

        seeded
    }

    fn seed_user(&self, id: &str, email: &str, full_name: &str) {
        self.users.lock().push(TestUser {
            email: email.to_string(),
            password: "hunter2".to_string(),
            token: format!("token-{}", id),
            user: AuthUser {
                id: id.to_string(),
                email: email.to_string(),
            },
        });
        self.profiles.lock().push(ProfileData {
            id: id.to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            avatar_url: None,
        });
    }

    pub fn seed_table(&self, id: &str, name: &str, creator_id: &str) {
        self.seed_table_with_code(id, name, creator_id, &invite_code(6));
    }

    pub fn seed_table_with_code(&self, id: &str, name: &str, creator_id: &str, code: &str) {
        let sequence = self.next_sequence();

        self.tables.lock().push(TableData {
            id: id.to_string(),
            name: name.to_string(),
            invite_code: code.to_string(),
            creator_id: creator_id.to_string(),
            created_at: self.base_time + ChronoDuration::seconds(sequence),
            last_order: None,
            image: None,
        });
    }

    pub fn seed_member(&self, table_id: &str, user_id: &str, username: Option<&str>) {
        let sequence = self.next_sequence();

        self.members.lock().push(TableMemberData {
            id: format!("m{}", sequence),
            table_id: table_id.to_string(),
            user_id: user_id.to_string(),
            username: username.map(str::to_string),
            joined_at: self.base_time + ChronoDuration::seconds(sequence),
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear()
    }

    pub fn table(&self, id: &str) -> Option<TableData> {
        self.tables.lock().iter().find(|t| t.id == id).cloned()
    }

    pub fn members_of(&self, table_id: &str) -> Vec<TableMemberData> {
        self.members
            .lock()
            .iter()
            .filter(|m| m.table_id == table_id)
            .cloned()
            .collect()
    }

    pub fn profile(&self, id: &str) -> Option<ProfileData> {
        self.profiles.lock().iter().find(|p| p.id == id).cloned()
    }

    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }

    fn next_sequence(&self) -> i64 {
        self.sequence.fetch_add(1) + 1
    }

    async fn write_gate(&self) -> BackendResult<()> {
        if self.delay_writes.load() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        if self.fail_writes.load() {
            return Err(BackendError::Network("injected failure".to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_up(&self, new_registration: NewRegistration) -> BackendResult<SessionData> {
        self.record("sign_up");

        let mut users = self.users.lock();
        if users.iter().any(|u| u.email == new_registration.email) {
            return Err(BackendError::Conflict {
                resource: "user",
                field: "email",
                value: new_registration.email,
            });
        }

        let id = format!("user-{}", 100 + self.next_sequence());
        let user = AuthUser {
            id: id.clone(),
            email: new_registration.email.clone(),
        };
        let token = format!("token-{}", id);

        users.push(TestUser {
            email: new_registration.email,
            password: new_registration.password,
            token: token.clone(),
            user: user.clone(),
        });

        Ok(SessionData {
            access_token: token,
            user,
        })
    }

    async fn sign_in(&self, credentials: Credentials) -> BackendResult<SessionData> {
        self.record("sign_in");

        self.users
            .lock()
            .iter()
            .find(|u| u.email == credentials.email && u.password == credentials.password)
            .map(|u| SessionData {
                access_token: u.token.clone(),
                user: u.user.clone(),
            })
            .ok_or_else(|| BackendError::Unauthorized("Invalid login credentials".to_string()))
    }

    async fn sign_out(&self, _token: &str) -> BackendResult<()> {
        self.record("sign_out");
        Ok(())
    }

    async fn session_user(&self, token: &str) -> BackendResult<SessionData> {
        self.record("session_user");

        self.users
            .lock()
            .iter()
            .find(|u| u.token == token)
            .map(|u| SessionData {
                access_token: u.token.clone(),
                user: u.user.clone(),
            })
            .ok_or_else(|| BackendError::Unauthorized("invalid token".to_string()))
    }

    async fn list_tables(&self) -> BackendResult<Vec<TableData>> {
        self.record("list_tables");
        Ok(self.tables.lock().clone())
    }

    async fn table_by_id(&self, table_id: &str) -> BackendResult<TableData> {
        self.record("table_by_id");

        self.table(table_id).ok_or(BackendError::NotFound {
            resource: "table",
            identifier: "id",
        })
    }

    async fn table_by_invite_code(&self, invite_code: &str) -> BackendResult<TableData> {
        self.record("table_by_invite_code");

        self.tables
            .lock()
            .iter()
            .find(|t| t.invite_code == invite_code)
            .cloned()
            .ok_or(BackendError::NotFound {
                resource: "table",
                identifier: "invite_code",
            })
    }

    async fn create_table(&self, new_table: NewTable) -> BackendResult<TableData> {
        self.record("create_table");
        self.write_gate().await?;

        let sequence = self.next_sequence();
        let table = TableData {
            id: format!("t{}", sequence),
            name: new_table.name,
            invite_code: new_table.invite_code,
            creator_id: new_table.creator_id,
            created_at: self.base_time + ChronoDuration::seconds(sequence),
            last_order: new_table.last_order,
            image: Some(new_table.image),
        };

        self.tables.lock().push(table.clone());

        Ok(table)
    }

    async fn update_table(&self, updated_table: UpdatedTable) -> BackendResult<TableData> {
        self.record("update_table");
        self.write_gate().await?;

        let mut tables = self.tables.lock();
        let table = tables
            .iter_mut()
            .find(|t| t.id == updated_table.id)
            .ok_or(BackendError::NotFound {
                resource: "table",
                identifier: "id",
            })?;

        if let Some(name) = updated_table.name {
            table.name = name;
        }
        if let Some(image) = updated_table.image {
            table.image = Some(image);
        }
        if let Some(last_order) = updated_table.last_order {
            table.last_order = Some(last_order);
        }

        Ok(table.clone())
    }

    async fn delete_table(&self, table_id: &str) -> BackendResult<()> {
        self.record("delete_table");
        self.write_gate().await?;

        let mut tables = self.tables.lock();
        let before = tables.len();
        tables.retain(|t| t.id != table_id);

        if tables.len() == before {
            return Err(BackendError::NotFound {
                resource: "table",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn count_tables_by_creator(&self, creator_id: &str) -> BackendResult<u64> {
        self.record("count_tables_by_creator");

        Ok(self
            .tables
            .lock()
            .iter()
            .filter(|t| t.creator_id == creator_id)
            .count() as u64)
    }

    async fn list_members(&self, table_id: &str) -> BackendResult<Vec<TableMemberData>> {
        self.record("list_members");
        Ok(self.members_of(table_id))
    }

    async fn create_member(&self, new_member: NewTableMember) -> BackendResult<TableMemberData> {
        self.record("create_member");
        self.write_gate().await?;

        let mut members = self.members.lock();
        if members
            .iter()
            .any(|m| m.table_id == new_member.table_id && m.user_id == new_member.user_id)
        {
            return Err(BackendError::Conflict {
                resource: "table member",
                field: "user:table",
                value: format!("{}:{}", new_member.user_id, new_member.table_id),
            });
        }

        let sequence = self.next_sequence();
        let member = TableMemberData {
            id: format!("m{}", sequence),
            table_id: new_member.table_id,
            user_id: new_member.user_id,
            username: new_member.username,
            joined_at: self.base_time + ChronoDuration::seconds(sequence),
        };

        members.push(member.clone());

        Ok(member)
    }

    async fn delete_member(&self, table_id: &str, user_id: &str) -> BackendResult<()> {
        self.record("delete_member");
        self.write_gate().await?;

        let mut members = self.members.lock();
        let before = members.len();
        members.retain(|m| !(m.table_id == table_id && m.user_id == user_id));

        if members.len() == before {
            return Err(BackendError::NotFound {
                resource: "table member",
                identifier: "table_id:user_id",
            });
        }

        Ok(())
    }

    async fn profile_by_id(&self, profile_id: &str) -> BackendResult<ProfileData> {
        self.record("profile_by_id");

        self.profile(profile_id).ok_or(BackendError::NotFound {
            resource: "profile",
            identifier: "id",
        })
    }

    async fn upsert_profile(&self, new_profile: NewProfile) -> BackendResult<ProfileData> {
        self.record("upsert_profile");
        self.write_gate().await?;

        let mut profiles = self.profiles.lock();
        profiles.retain(|p| p.id != new_profile.id);

        let profile = ProfileData {
            id: new_profile.id,
            full_name: new_profile.full_name,
            email: new_profile.email,
            avatar_url: None,
        };
        profiles.push(profile.clone());

        Ok(profile)
    }

    async fn update_profile(&self, updated_profile: UpdatedProfile) -> BackendResult<ProfileData> {
        self.record("update_profile");
        self.write_gate().await?;

        let mut profiles = self.profiles.lock();
        let profile = profiles
            .iter_mut()
            .find(|p| p.id == updated_profile.id)
            .ok_or(BackendError::NotFound {
                resource: "profile",
                identifier: "id",
            })?;

        if let Some(full_name) = updated_profile.full_name {
            profile.full_name = full_name;
        }
        if let Some(avatar_url) = updated_profile.avatar_url {
            profile.avatar_url = Some(avatar_url);
        }

        Ok(profile.clone())
    }
}

/// In-memory object storage recording every upload and delete
pub(crate) struct MemoryStorage {
    pub uploads: Mutex<Vec<(String, String)>>,
    pub deletes: Mutex<Vec<(String, String)>>,
    pub fail_uploads: AtomicCell<bool>,
    pub fail_deletes: AtomicCell<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            uploads: Default::default(),
            deletes: Default::default(),
            fail_uploads: AtomicCell::new(false),
            fail_deletes: AtomicCell::new(false),
        }
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        filename: &str,
        _asset: NewAsset,
    ) -> Result<String, StorageError> {
        if self.fail_uploads.load() {
            return Err(StorageError::UploadFailed {
                filename: filename.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        self.uploads
            .lock()
            .push((bucket.to_string(), filename.to_string()));

        Ok(format!("https://storage.test/{}/{}", bucket, filename))
    }

    async fn delete(&self, bucket: &str, filename: &str) -> Result<(), StorageError> {
        if self.fail_deletes.load() {
            return Err(StorageError::DeleteFailed {
                filename: filename.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        self.deletes
            .lock()
            .push((bucket.to_string(), filename.to_string()));

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeQuery {
    pub text: Option<String>,
    pub coordinates: Coordinates,
}

/// A places gateway returning one canned result per query
pub(crate) struct FakePlaces {
    pub queries: Mutex<Vec<FakeQuery>>,
    pub fail: AtomicCell<bool>,
    pub delay_in_ms: AtomicCell<u64>,
}

impl FakePlaces {
    pub fn new() -> Self {
        Self {
            queries: Default::default(),
            fail: AtomicCell::new(false),
            delay_in_ms: AtomicCell::new(0),
        }
    }

    async fn respond(&self, name: &str) -> Result<Vec<PlaceData>, PlacesError> {
        let delay = self.delay_in_ms.load();
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail.load() {
            return Err(PlacesError::FetchError("injected failure".to_string()));
        }

        Ok(vec![PlaceData {
            provider_id: format!("p-{}", name),
            name: name.to_string(),
            address: None,
            rating: None,
            ratings_total: None,
            price_level: None,
            photo_url: None,
            open_now: None,
        }])
    }
}

#[async_trait]
impl PlacesGateway for FakePlaces {
    async fn search_nearby(
        &self,
        coordinates: Coordinates,
        _radius_in_meters: u32,
    ) -> Result<Vec<PlaceData>, PlacesError> {
        self.queries.lock().push(FakeQuery {
            text: None,
            coordinates,
        });

        self.respond("nearby").await
    }

    async fn search_text(
        &self,
        query: &str,
        coordinates: Coordinates,
        _radius_in_meters: u32,
    ) -> Result<Vec<PlaceData>, PlacesError> {
        self.queries.lock().push(FakeQuery {
            text: Some(query.to_string()),
            coordinates,
        });

        self.respond(query).await
    }
}

/// A location provider with a fixed answer
pub(crate) struct FixedLocation(Option<Coordinates>);

impl FixedLocation {
    pub fn new(coordinates: Coordinates) -> Self {
        Self(Some(coordinates))
    }

    pub fn denied() -> Self {
        Self(None)
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current(&self) -> Result<Coordinates, LocationError> {
        self.0.ok_or(LocationError::PermissionDenied)
    }
}

/// A session store double with no persistence
#[derive(Default)]
pub(crate) struct TestSessionStore {
    token: Mutex<Option<String>>,
}

impl SessionStore for TestSessionStore {
    fn load(&self) -> Option<String> {
        self.token.lock().clone()
    }

    fn store(&self, token: &str) {
        *self.token.lock() = Some(token.to_string());
    }

    fn clear(&self) {
        *self.token.lock() = None;
    }
}
