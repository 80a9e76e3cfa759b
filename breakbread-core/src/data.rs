use chrono::{DateTime, Utc};

/// The type used for record identifiers assigned by the backend.
pub type RecordId = String;

/// A dining table, the group users gather around.
#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    pub id: RecordId,
    pub name: String,
    /// The short code members share to join the table
    pub invite_code: String,
    pub creator_id: RecordId,
    pub created_at: DateTime<Utc>,
    /// Free-text summary of the most recent order, if any
    pub last_order: Option<String>,
    pub image: Option<ImageRef>,
}

/// A reference to a stored banner or avatar image.
///
/// `filename` is present only when the asset was uploaded by a user, which
/// makes it deletable. Placeholder images carry a url and no filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    url: String,
    filename: Option<String>,
}

impl ImageRef {
    /// An image a user uploaded to object storage
    pub fn uploaded(url: String, filename: String) -> Self {
        Self {
            url,
            filename: Some(filename),
        }
    }

    /// A well-known default image that is never deleted
    pub fn placeholder(url: String) -> Self {
        Self {
            url,
            filename: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Returns true if this image points at a user-owned storage object
    pub fn is_deletable(&self) -> bool {
        self.filename.is_some()
    }
}

/// A membership row linking a user to a table
#[derive(Debug, Clone, PartialEq)]
pub struct TableMemberData {
    pub id: RecordId,
    pub table_id: RecordId,
    pub user_id: RecordId,
    /// Display name snapshot taken when the user joined
    pub username: Option<String>,
    pub joined_at: DateTime<Utc>,
}

/// A Break Bread user profile
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileData {
    /// Matches the authentication subject id
    pub id: RecordId,
    pub full_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

/// The authenticated user as reported by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: RecordId,
    pub email: String,
}

/// An authenticated session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionData {
    /// The opaque token attached to subsequent backend requests
    pub access_token: String,
    pub user: AuthUser,
}

/// A place returned by the external search service.
/// Ephemeral: lives exactly as long as one search response.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceData {
    /// Identifier assigned by the search provider
    pub provider_id: String,
    pub name: String,
    pub address: Option<String>,
    pub rating: Option<f32>,
    pub ratings_total: Option<u32>,
    pub price_level: Option<u8>,
    pub photo_url: Option<String>,
    pub open_now: Option<bool>,
}

/// A latitude/longitude pair from the device location service
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Bytes of an image about to be uploaded
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub extension: String,
}

impl NewAsset {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: "image/jpeg".to_string(),
            extension: "jpg".to_string(),
        }
    }

    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: "image/png".to_string(),
            extension: "png".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct NewTable {
    pub name: String,
    pub invite_code: String,
    /// The creator of the new table
    pub creator_id: RecordId,
    pub image: ImageRef,
    pub last_order: Option<String>,
}

#[derive(Debug)]
pub struct UpdatedTable {
    pub id: RecordId,
    pub name: Option<String>,
    pub image: Option<ImageRef>,
    pub last_order: Option<String>,
}

#[derive(Debug)]
pub struct NewTableMember {
    pub table_id: RecordId,
    pub user_id: RecordId,
    pub username: Option<String>,
}

#[derive(Debug)]
pub struct NewProfile {
    pub id: RecordId,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug)]
pub struct UpdatedProfile {
    pub id: RecordId,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewRegistration {
    pub full_name: String,
    pub email: String,
    pub password: String,
}
