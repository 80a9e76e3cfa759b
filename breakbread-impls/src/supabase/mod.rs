mod backend;
mod storage;

pub use backend::*;
pub use storage::*;

use std::sync::Arc;

use breakbread_core::BackendError;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response, StatusCode};

/// Helper trait to reduce boilerplate when mapping transport errors
pub trait IntoBackendError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> BackendError;
    fn any(self) -> BackendError;
}

impl IntoBackendError for reqwest::Error {
    fn any(self) -> BackendError {
        if self.is_connect() || self.is_timeout() {
            return BackendError::Network(self.to_string());
        }

        BackendError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> BackendError {
        if self.status() == Some(StatusCode::NOT_FOUND) {
            return BackendError::NotFound {
                resource,
                identifier,
            };
        }

        self.any()
    }
}

/// Connection details shared by the REST and storage clients.
/// The signed-in session lives here so both attach the same credential.
#[derive(Clone)]
pub(crate) struct SupabaseConnection {
    pub(crate) http: Client,
    pub(crate) base_url: String,
    pub(crate) anon_key: String,
    access_token: Arc<RwLock<Option<String>>>,
}

impl SupabaseConnection {
    pub(crate) fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: Arc::new(RwLock::new(None)),
        }
    }

    pub(crate) fn set_session(&self, token: &str) {
        *self.access_token.write() = Some(token.to_string());
    }

    pub(crate) fn clear_session(&self) {
        *self.access_token.write() = None;
    }

    /// Attaches the service key and the strongest credential available
    pub(crate) fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .access_token
            .read()
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());

        builder.header("apikey", &self.anon_key).bearer_auth(bearer)
    }

    pub(crate) fn rest_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection)
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    pub(crate) fn object_url(&self, bucket: &str, filename: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, filename)
    }

    pub(crate) fn public_object_url(&self, bucket: &str, filename: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, filename
        )
    }

    /// Maps an unsuccessful response to a typed error
    pub(crate) async fn check(
        &self,
        response: Response,
        resource: &'static str,
        identifier: &'static str,
    ) -> Result<Response, BackendError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
            StatusCode::NOT_FOUND => BackendError::NotFound {
                resource,
                identifier,
            },
            StatusCode::CONFLICT => BackendError::Conflict {
                resource,
                field: identifier,
                value: message,
            },
            _ => BackendError::Network(format!("{}: {}", status, message)),
        })
    }
}
