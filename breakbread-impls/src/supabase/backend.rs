use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use breakbread_core::{
    Backend, BackendError, BackendResult, AuthUser, Credentials, ImageRef, NewProfile,
    NewRegistration, NewTable, NewTableMember, ProfileData, SessionData, TableData,
    TableMemberData, UpdatedProfile, UpdatedTable,
};

use super::{IntoBackendError, SupabaseConnection, SupabaseStorage};

/// A Break Bread backend reached over the Supabase-style REST contract
pub struct SupabaseBackend {
    connection: SupabaseConnection,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    id: String,
    name: String,
    invite_code: String,
    creator_id: String,
    created_at: DateTime<Utc>,
    lastorder: Option<String>,
    image: Option<String>,
    image_filename: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewTableRow<'a> {
    name: &'a str,
    invite_code: &'a str,
    creator_id: &'a str,
    image: &'a str,
    image_filename: Option<&'a str>,
    lastorder: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct MemberRow {
    id: String,
    table_id: String,
    user_id: String,
    username: Option<String>,
    joined_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct NewMemberRow<'a> {
    table_id: &'a str,
    user_id: &'a str,
    username: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: String,
    full_name: String,
    email: String,
    avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewProfileRow<'a> {
    id: &'a str,
    full_name: &'a str,
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    user: Option<UserResponse>,
}

impl TableRow {
    fn into_data(self) -> TableData {
        // A url without a filename is a placeholder or legacy row.
        // A filename without a url is unreachable and treated as absent.
        let image = match (self.image, self.image_filename) {
            (Some(url), Some(filename)) => Some(ImageRef::uploaded(url, filename)),
            (Some(url), None) => Some(ImageRef::placeholder(url)),
            (None, _) => None,
        };

        TableData {
            id: self.id,
            name: self.name,
            invite_code: self.invite_code,
            creator_id: self.creator_id,
            created_at: self.created_at,
            last_order: self.lastorder,
            image,
        }
    }
}

impl MemberRow {
    fn into_data(self) -> TableMemberData {
        TableMemberData {
            id: self.id,
            table_id: self.table_id,
            user_id: self.user_id,
            username: self.username,
            joined_at: self.joined_at,
        }
    }
}

impl ProfileRow {
    fn into_data(self) -> ProfileData {
        ProfileData {
            id: self.id,
            full_name: self.full_name,
            email: self.email,
            avatar_url: self.avatar_url,
        }
    }
}

impl TokenResponse {
    fn into_session(self) -> BackendResult<SessionData> {
        match (self.access_token, self.user) {
            (Some(access_token), Some(user)) => Ok(SessionData {
                access_token,
                user: AuthUser {
                    id: user.id,
                    email: user.email,
                },
            }),
            // The service accepted the account but withheld a session,
            // which happens while email confirmation is still pending
            _ => Err(BackendError::Unauthorized(
                "Email confirmation is required before signing in".to_string(),
            )),
        }
    }
}

/// Parses the total from a `Content-Range` header value such as `0-0/42`
fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.parse().ok()
}

impl SupabaseBackend {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            connection: SupabaseConnection::new(base_url, anon_key),
        }
    }

    /// Creates a storage client sharing this backend's connection,
    /// so uploads carry the same session credential
    pub fn storage(&self) -> SupabaseStorage {
        SupabaseStorage::from_connection(self.connection.clone())
    }

    async fn tables_matching(
        &self,
        filter: (&str, String),
        identifier: &'static str,
    ) -> BackendResult<Vec<TableData>> {
        let request = self
            .connection
            .authed(self.connection.http.get(self.connection.rest_url("tables")))
            .query(&[("select", "*".to_string()), (filter.0, filter.1)]);

        let response = request.send().await.map_err(|e| e.any())?;
        let rows: Vec<TableRow> = self
            .connection
            .check(response, "table", identifier)
            .await?
            .json()
            .await
            .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(TableRow::into_data).collect())
    }

    async fn single_table(
        &self,
        filter: (&str, String),
        identifier: &'static str,
    ) -> BackendResult<TableData> {
        self.tables_matching(filter, identifier)
            .await?
            .into_iter()
            .next()
            .ok_or(BackendError::NotFound {
                resource: "table",
                identifier,
            })
    }
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn sign_up(&self, new_registration: NewRegistration) -> BackendResult<SessionData> {
        let response = self
            .connection
            .http
            .post(self.connection.auth_url("signup"))
            .header("apikey", &self.connection.anon_key)
            .json(&json!({
                "email": new_registration.email,
                "password": new_registration.password,
                "data": { "full_name": new_registration.full_name },
            }))
            .send()
            .await
            .map_err(|e| e.any())?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();

            return Err(if status.as_u16() == 422 || status.as_u16() == 409 {
                BackendError::Conflict {
                    resource: "user",
                    field: "email",
                    value: message,
                }
            } else {
                BackendError::Unauthorized(message)
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| e.any())?;
        let session = token.into_session()?;

        self.connection.set_session(&session.access_token);

        Ok(session)
    }

    async fn sign_in(&self, credentials: Credentials) -> BackendResult<SessionData> {
        let response = self
            .connection
            .http
            .post(self.connection.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.connection.anon_key)
            .json(&json!({
                "email": credentials.email,
                "password": credentials.password,
            }))
            .send()
            .await
            .map_err(|e| e.any())?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Unauthorized(message));
        }

        let token: TokenResponse = response.json().await.map_err(|e| e.any())?;
        let session = token.into_session()?;

        self.connection.set_session(&session.access_token);

        Ok(session)
    }

    async fn sign_out(&self, token: &str) -> BackendResult<()> {
        // The local credential is dropped no matter what the service says
        self.connection.clear_session();

        let response = self
            .connection
            .http
            .post(self.connection.auth_url("logout"))
            .header("apikey", &self.connection.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| e.any())?;

        self.connection.check(response, "session", "token").await?;

        Ok(())
    }

    async fn session_user(&self, token: &str) -> BackendResult<SessionData> {
        let response = self
            .connection
            .http
            .get(self.connection.auth_url("user"))
            .header("apikey", &self.connection.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| e.any())?;

        let user: UserResponse = self
            .connection
            .check(response, "session", "token")
            .await?
            .json()
            .await
            .map_err(|e| e.any())?;

        self.connection.set_session(token);

        Ok(SessionData {
            access_token: token.to_string(),
            user: AuthUser {
                id: user.id,
                email: user.email,
            },
        })
    }

    async fn list_tables(&self) -> BackendResult<Vec<TableData>> {
        self.tables_matching(("order", "created_at.desc".to_string()), "all")
            .await
    }

    async fn table_by_id(&self, table_id: &str) -> BackendResult<TableData> {
        self.single_table(("id", format!("eq.{}", table_id)), "id")
            .await
    }

    async fn table_by_invite_code(&self, invite_code: &str) -> BackendResult<TableData> {
        self.single_table(
            ("invite_code", format!("eq.{}", invite_code)),
            "invite_code",
        )
        .await
    }

    async fn create_table(&self, new_table: NewTable) -> BackendResult<TableData> {
        let row = NewTableRow {
            name: &new_table.name,
            invite_code: &new_table.invite_code,
            creator_id: &new_table.creator_id,
            image: new_table.image.url(),
            image_filename: new_table.image.filename(),
            lastorder: new_table.last_order.as_deref(),
        };

        let response = self
            .connection
            .authed(self.connection.http.post(self.connection.rest_url("tables")))
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await
            .map_err(|e| e.any())?;

        let rows: Vec<TableRow> = self
            .connection
            .check(response, "table", "invite_code")
            .await?
            .json()
            .await
            .map_err(|e| e.any())?;

        rows.into_iter()
            .next()
            .map(TableRow::into_data)
            .ok_or_else(|| BackendError::Network("insert returned no row".to_string()))
    }

    async fn update_table(&self, updated_table: UpdatedTable) -> BackendResult<TableData> {
        let mut patch = Map::new();

        if let Some(name) = &updated_table.name {
            patch.insert("name".to_string(), json!(name));
        }
        if let Some(image) = &updated_table.image {
            patch.insert("image".to_string(), json!(image.url()));
            patch.insert("image_filename".to_string(), json!(image.filename()));
        }
        if let Some(last_order) = &updated_table.last_order {
            patch.insert("lastorder".to_string(), json!(last_order));
        }

        if patch.is_empty() {
            return self.table_by_id(&updated_table.id).await;
        }

        let response = self
            .connection
            .authed(
                self.connection
                    .http
                    .patch(self.connection.rest_url("tables")),
            )
            .query(&[("id", format!("eq.{}", updated_table.id))])
            .header("Prefer", "return=representation")
            .json(&Value::Object(patch))
            .send()
            .await
            .map_err(|e| e.any())?;

        let rows: Vec<TableRow> = self
            .connection
            .check(response, "table", "id")
            .await?
            .json()
            .await
            .map_err(|e| e.any())?;

        rows.into_iter()
            .next()
            .map(TableRow::into_data)
            .ok_or(BackendError::NotFound {
                resource: "table",
                identifier: "id",
            })
    }

    async fn delete_table(&self, table_id: &str) -> BackendResult<()> {
        // Ensure the table exists, since a filtered delete succeeds silently
        let _ = self.table_by_id(table_id).await?;

        let response = self
            .connection
            .authed(
                self.connection
                    .http
                    .delete(self.connection.rest_url("tables")),
            )
            .query(&[("id", format!("eq.{}", table_id))])
            .send()
            .await
            .map_err(|e| e.any())?;

        self.connection.check(response, "table", "id").await?;

        Ok(())
    }

    async fn count_tables_by_creator(&self, creator_id: &str) -> BackendResult<u64> {
        let response = self
            .connection
            .authed(self.connection.http.get(self.connection.rest_url("tables")))
            .query(&[
                ("select", "id".to_string()),
                ("creator_id", format!("eq.{}", creator_id)),
            ])
            .header("Prefer", "count=exact")
            .header("Range", "0-0")
            .send()
            .await
            .map_err(|e| e.any())?;

        let response = self.connection.check(response, "table", "creator_id").await?;

        let count = response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| BackendError::Network("missing count in response".to_string()))?;

        Ok(count)
    }

    async fn list_members(&self, table_id: &str) -> BackendResult<Vec<TableMemberData>> {
        let response = self
            .connection
            .authed(
                self.connection
                    .http
                    .get(self.connection.rest_url("table_members")),
            )
            .query(&[
                ("select", "*".to_string()),
                ("table_id", format!("eq.{}", table_id)),
                ("order", "joined_at.asc".to_string()),
            ])
            .send()
            .await
            .map_err(|e| e.any())?;

        let rows: Vec<MemberRow> = self
            .connection
            .check(response, "table member", "table_id")
            .await?
            .json()
            .await
            .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(MemberRow::into_data).collect())
    }

    async fn create_member(&self, new_member: NewTableMember) -> BackendResult<TableMemberData> {
        let row = NewMemberRow {
            table_id: &new_member.table_id,
            user_id: &new_member.user_id,
            username: new_member.username.as_deref(),
        };

        let response = self
            .connection
            .authed(
                self.connection
                    .http
                    .post(self.connection.rest_url("table_members")),
            )
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await
            .map_err(|e| e.any())?;

        let rows: Vec<MemberRow> = self
            .connection
            .check(response, "table member", "user:table")
            .await?
            .json()
            .await
            .map_err(|e| e.any())?;

        rows.into_iter()
            .next()
            .map(MemberRow::into_data)
            .ok_or_else(|| BackendError::Network("insert returned no row".to_string()))
    }

    async fn delete_member(&self, table_id: &str, user_id: &str) -> BackendResult<()> {
        // Ensure the membership row exists before the filtered delete
        let response = self
            .connection
            .authed(
                self.connection
                    .http
                    .get(self.connection.rest_url("table_members")),
            )
            .query(&[
                ("select", "id".to_string()),
                ("table_id", format!("eq.{}", table_id)),
                ("user_id", format!("eq.{}", user_id)),
            ])
            .send()
            .await
            .map_err(|e| e.any())?;

        let rows: Vec<Value> = self
            .connection
            .check(response, "table member", "table_id:user_id")
            .await?
            .json()
            .await
            .map_err(|e| e.any())?;

        if rows.is_empty() {
            return Err(BackendError::NotFound {
                resource: "table member",
                identifier: "table_id:user_id",
            });
        }

        let response = self
            .connection
            .authed(
                self.connection
                    .http
                    .delete(self.connection.rest_url("table_members")),
            )
            .query(&[
                ("table_id", format!("eq.{}", table_id)),
                ("user_id", format!("eq.{}", user_id)),
            ])
            .send()
            .await
            .map_err(|e| e.any())?;

        self.connection
            .check(response, "table member", "table_id:user_id")
            .await?;

        Ok(())
    }

    async fn profile_by_id(&self, profile_id: &str) -> BackendResult<ProfileData> {
        let response = self
            .connection
            .authed(
                self.connection
                    .http
                    .get(self.connection.rest_url("profiles")),
            )
            .query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{}", profile_id)),
            ])
            .send()
            .await
            .map_err(|e| e.any())?;

        let rows: Vec<ProfileRow> = self
            .connection
            .check(response, "profile", "id")
            .await?
            .json()
            .await
            .map_err(|e| e.any())?;

        rows.into_iter()
            .next()
            .map(ProfileRow::into_data)
            .ok_or(BackendError::NotFound {
                resource: "profile",
                identifier: "id",
            })
    }

    async fn upsert_profile(&self, new_profile: NewProfile) -> BackendResult<ProfileData> {
        let row = NewProfileRow {
            id: &new_profile.id,
            full_name: &new_profile.full_name,
            email: &new_profile.email,
        };

        let response = self
            .connection
            .authed(
                self.connection
                    .http
                    .post(self.connection.rest_url("profiles")),
            )
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[row])
            .send()
            .await
            .map_err(|e| e.any())?;

        let rows: Vec<ProfileRow> = self
            .connection
            .check(response, "profile", "id")
            .await?
            .json()
            .await
            .map_err(|e| e.any())?;

        rows.into_iter()
            .next()
            .map(ProfileRow::into_data)
            .ok_or_else(|| BackendError::Network("upsert returned no row".to_string()))
    }

    async fn update_profile(&self, updated_profile: UpdatedProfile) -> BackendResult<ProfileData> {
        let mut patch = Map::new();

        if let Some(full_name) = &updated_profile.full_name {
            patch.insert("full_name".to_string(), json!(full_name));
        }
        if let Some(avatar_url) = &updated_profile.avatar_url {
            patch.insert("avatar_url".to_string(), json!(avatar_url));
        }

        if patch.is_empty() {
            return self.profile_by_id(&updated_profile.id).await;
        }

        let response = self
            .connection
            .authed(
                self.connection
                    .http
                    .patch(self.connection.rest_url("profiles")),
            )
            .query(&[("id", format!("eq.{}", updated_profile.id))])
            .header("Prefer", "return=representation")
            .json(&Value::Object(patch))
            .send()
            .await
            .map_err(|e| e.any())?;

        let rows: Vec<ProfileRow> = self
            .connection
            .check(response, "profile", "id")
            .await?
            .json()
            .await
            .map_err(|e| e.any())?;

        rows.into_iter()
            .next()
            .map(ProfileRow::into_data)
            .ok_or(BackendError::NotFound {
                resource: "profile",
                identifier: "id",
            })
    }
}
