mod assets;
mod auth;
mod logging;
mod profiles;
mod search;
mod tables;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use crossbeam::channel::unbounded;

use breakbread_core::{
    Backend, ClientEvent, Config, EventReceiver, EventSender, LocationProvider, ObjectStorage,
    PlacesGateway, SessionStore,
};

pub use assets::*;
pub use auth::*;
pub use logging::*;
pub use profiles::*;
pub use search::*;
pub use tables::*;

/// The Break Bread client system, facilitating table management,
/// authentication, profiles, and restaurant search.
pub struct BreakBread<Db, St, Pl, Lo> {
    context: ClientContext<Db, St>,
    places: Arc<Pl>,
    location: Arc<Lo>,

    event_receiver: EventReceiver,

    pub auth: Auth<Db>,
    pub tables: TableManager<Db, St>,
    pub profiles: ProfileManager<Db, St>,
}

/// A type passed to the managers of the client, to access collaborators and
/// emit events.
pub struct ClientContext<Db, St> {
    pub config: Config,
    pub backend: Arc<Db>,
    pub storage: Arc<St>,

    pub(crate) event_sender: EventSender,
}

impl<Db, St, Pl, Lo> BreakBread<Db, St, Pl, Lo>
where
    Db: Backend + 'static,
    St: ObjectStorage + 'static,
    Pl: PlacesGateway + 'static,
    Lo: LocationProvider + 'static,
{
    pub fn new<Se>(
        config: Config,
        backend: Db,
        storage: St,
        places: Pl,
        location: Lo,
        session_store: Se,
    ) -> Self
    where
        Se: SessionStore + 'static,
    {
        let (event_sender, event_receiver) = unbounded();

        let context = ClientContext {
            config,
            backend: Arc::new(backend),
            storage: Arc::new(storage),
            event_sender,
        };

        let auth = Auth::new(&context, Arc::new(session_store));
        let tables = TableManager::new(&context, auth.session());
        let profiles = ProfileManager::new(&context, auth.session());

        Self {
            places: Arc::new(places),
            location: Arc::new(location),
            event_receiver,
            auth,
            tables,
            profiles,
            context,
        }
    }

    pub fn config(&self) -> &Config {
        &self.context.config
    }

    /// Creates a debounced search controller for one screen activation
    pub fn create_search(&self) -> SearchController<Pl, Lo> {
        SearchController::new(
            self.places.clone(),
            self.location.clone(),
            self.context.config.clone(),
            self.context.event_sender.clone(),
        )
    }

    /// Receive events from the client.
    pub fn wait_for_event(&self) -> ClientEvent {
        self.event_receiver
            .recv()
            .expect("event is received without error")
    }
}

impl<Db, St> ClientContext<Db, St> {
    pub(crate) fn emit(&self, event: ClientEvent) {
        self.event_sender.send(event).expect("event is sent")
    }
}

impl<Db, St> Clone for ClientContext<Db, St> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            backend: self.backend.clone(),
            storage: self.storage.clone(),
            event_sender: self.event_sender.clone(),
        }
    }
}
