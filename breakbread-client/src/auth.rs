use std::sync::Arc;

use log::{info, warn};
use parking_lot::Mutex;
use thiserror::Error;

use breakbread_core::{
    Backend, BackendError, ClientEvent, Credentials, EventSender, NewProfile, NewRegistration,
    RecordId, SessionData, SessionStore,
};

use crate::ClientContext;

/// Handles registration, login, and session restoration.
pub struct Auth<Db> {
    backend: Arc<Db>,
    session_store: Arc<dyn SessionStore>,
    session: SessionHandle,
    events: EventSender,
}

/// The signed-in session, shared with the managers for authorization gating
#[derive(Clone, Default)]
pub(crate) struct SessionHandle {
    inner: Arc<Mutex<Option<SessionData>>>,
}

impl SessionHandle {
    pub(crate) fn current(&self) -> Option<SessionData> {
        self.inner.lock().clone()
    }

    fn set(&self, session: Option<SessionData>) {
        *self.inner.lock() = session;
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Not logged in")]
    NotLoggedIn,
    /// A required field was empty
    #[error("{0}")]
    Validation(String),
    /// Something else went wrong in the backend
    #[error(transparent)]
    Backend(BackendError),
}

impl<Db> Auth<Db>
where
    Db: Backend,
{
    pub fn new<St>(context: &ClientContext<Db, St>, session_store: Arc<dyn SessionStore>) -> Self {
        Self {
            backend: context.backend.clone(),
            session_store,
            session: Default::default(),
            events: context.event_sender.clone(),
        }
    }

    /// Registers a new account and its profile row, returning the session
    pub async fn register(
        &self,
        new_registration: NewRegistration,
    ) -> Result<SessionData, AuthError> {
        let full_name = new_registration.full_name.trim().to_string();
        let email = new_registration.email.trim().to_string();

        if full_name.is_empty() {
            return Err(AuthError::Validation("Full name cannot be empty".to_string()));
        }
        if email.is_empty() {
            return Err(AuthError::Validation("Email cannot be empty".to_string()));
        }
        if new_registration.password.is_empty() {
            return Err(AuthError::Validation("Password cannot be empty".to_string()));
        }

        let session = self
            .backend
            .sign_up(NewRegistration {
                full_name: full_name.clone(),
                email: email.clone(),
                password: new_registration.password,
            })
            .await
            .map_err(AuthError::Backend)?;

        // Upserted, so registering again with the same account stays idempotent
        self.backend
            .upsert_profile(NewProfile {
                id: session.user.id.clone(),
                full_name,
                email,
            })
            .await
            .map_err(AuthError::Backend)?;

        info!("Registered {}", session.user.email);
        self.remember(session.clone());

        Ok(session)
    }

    /// Logs in a user, returning the new session
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(AuthError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let session = self
            .backend
            .sign_in(credentials)
            .await
            .map_err(|e| match e {
                BackendError::Unauthorized(_) | BackendError::NotFound { .. } => {
                    AuthError::InvalidCredentials
                }
                e => AuthError::Backend(e),
            })?;

        self.remember(session.clone());

        Ok(session)
    }

    /// Restores the cached session, if the backend still accepts its token
    pub async fn restore(&self) -> Result<Option<SessionData>, AuthError> {
        let Some(token) = self.session_store.load() else {
            return Ok(None);
        };

        match self.backend.session_user(&token).await {
            Ok(session) => {
                self.remember(session.clone());
                Ok(Some(session))
            }
            Err(e) if e.invalidates_session() => {
                // A rejected token is useless, forget it
                self.session_store.clear();
                Ok(None)
            }
            Err(e) => Err(AuthError::Backend(e)),
        }
    }

    /// Ends the session. Local teardown happens even when the backend call
    /// fails, so the user is never stuck signed in.
    pub async fn logout(&self) {
        if let Some(session) = self.session.current() {
            if let Err(e) = self.backend.sign_out(&session.access_token).await {
                warn!("Backend sign-out failed: {}", e);
            }
        }

        self.session_store.clear();
        self.session.set(None);
        self.events
            .send(ClientEvent::SessionChanged { user_id: None })
            .expect("event is sent");
    }

    /// The signed-in session, if any
    pub fn current(&self) -> Option<SessionData> {
        self.session.current()
    }

    /// The signed-in user id
    pub fn user_id(&self) -> Result<RecordId, AuthError> {
        self.session
            .current()
            .map(|session| session.user.id)
            .ok_or(AuthError::NotLoggedIn)
    }

    pub(crate) fn session(&self) -> SessionHandle {
        self.session.clone()
    }

    fn remember(&self, session: SessionData) {
        self.session_store.store(&session.access_token);

        let user_id = session.user.id.clone();
        self.session.set(Some(session));

        self.events
            .send(ClientEvent::SessionChanged {
                user_id: Some(user_id),
            })
            .expect("event is sent");
    }
}
