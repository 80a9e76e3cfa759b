use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use breakbread_core::{
    ClientEvent, Config, Coordinates, EventSender, Id, LocationError, LocationProvider, PlaceData,
    PlacesGateway,
};

/// Marker type for search request generations
pub struct SearchRequest;

pub type SearchGeneration = Id<SearchRequest>;

/// The lifecycle of the controller's current query
#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    /// Nothing is scheduled or running
    Idle,
    /// Input changed recently and a query is scheduled
    Pending,
    /// A request is in flight
    Fetching,
    /// The last query failed and results were cleared
    Failed(String),
}

/// Coalesces rapid input changes into a single delayed places query.
///
/// Each input change cancels the pending timer and schedules a new one, so
/// only the most recently scheduled timer fires a request. Responses are
/// guarded by a generation counter: an in-flight request is never aborted,
/// but its response is discarded when a newer request superseded it.
pub struct SearchController<Pl, Lo> {
    inner: Arc<SearchInner<Pl, Lo>>,
}

struct SearchInner<Pl, Lo> {
    places: Arc<Pl>,
    location: Arc<Lo>,
    config: Config,
    events: EventSender,

    /// Obtained once per controller lifetime by `activate`
    coordinates: Mutex<Option<Coordinates>>,
    state: Mutex<SearchState>,
    results: Mutex<Vec<PlaceData>>,
    /// The most recently scheduled request; older responses are discarded
    latest: AtomicCell<SearchGeneration>,
    /// The timer that has not fired yet, if any
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<Pl, Lo> SearchController<Pl, Lo>
where
    Pl: PlacesGateway + 'static,
    Lo: LocationProvider + 'static,
{
    pub fn new(places: Arc<Pl>, location: Arc<Lo>, config: Config, events: EventSender) -> Self {
        Self {
            inner: Arc::new(SearchInner {
                places,
                location,
                config,
                events,
                coordinates: Default::default(),
                state: Mutex::new(SearchState::Idle),
                results: Default::default(),
                latest: AtomicCell::new(SearchGeneration::none()),
                pending: Default::default(),
            }),
        }
    }

    /// Resolves coordinates once for this controller's lifetime and
    /// schedules the initial nearby query.
    ///
    /// When permission is denied no query is ever issued; the denial is
    /// surfaced here and as the controller's failure state.
    pub async fn activate(&self) -> Result<(), LocationError> {
        match self.inner.location.current().await {
            Ok(coordinates) => {
                *self.inner.coordinates.lock() = Some(coordinates);
                self.set_input("");

                Ok(())
            }
            Err(e) => {
                self.inner.results.lock().clear();
                *self.inner.state.lock() = SearchState::Failed(e.to_string());

                Err(e)
            }
        }
    }

    /// Reschedules the query for the given input, replacing any pending
    /// timer. Non-empty input searches by text, empty input by proximity.
    ///
    /// Must be called from within the client's async runtime.
    pub fn set_input(&self, input: &str) {
        // Without coordinates there is nothing to query against
        if self.inner.coordinates.lock().is_none() {
            return;
        }

        let generation = SearchGeneration::new();
        self.inner.latest.store(generation);

        let mut pending = self.inner.pending.lock();

        // A timer that has not fired yet is cancelled outright; a request
        // already in flight is left to finish and discarded by generation
        if let Some(timer) = pending.take() {
            timer.abort();
        }

        *self.inner.state.lock() = SearchState::Pending;

        let inner = self.inner.clone();
        let input = input.trim().to_string();

        *pending = Some(tokio::spawn(async move {
            sleep(inner.config.debounce_interval()).await;

            if !inner.is_latest(generation) {
                return;
            }

            // The timer fired, it can no longer be cancelled
            inner.pending.lock().take();

            inner.run(generation, input).await;
        }));
    }

    /// The results of the most recent successful query
    pub fn results(&self) -> Vec<PlaceData> {
        self.inner.results.lock().clone()
    }

    pub fn state(&self) -> SearchState {
        self.inner.state.lock().clone()
    }
}

impl<Pl, Lo> SearchInner<Pl, Lo>
where
    Pl: PlacesGateway,
    Lo: LocationProvider,
{
    fn is_latest(&self, generation: SearchGeneration) -> bool {
        self.latest.load() == generation
    }

    async fn run(&self, generation: SearchGeneration, input: String) {
        let Some(coordinates) = *self.coordinates.lock() else {
            return;
        };

        *self.state.lock() = SearchState::Fetching;

        let radius = self.config.search_radius_in_meters;
        let result = if input.is_empty() {
            self.places.search_nearby(coordinates, radius).await
        } else {
            self.places.search_text(&input, coordinates, radius).await
        };

        // Only the response to the most recent request may update results,
        // regardless of arrival order
        if !self.is_latest(generation) {
            return;
        }

        match result {
            Ok(places) => {
                *self.results.lock() = places.clone();
                *self.state.lock() = SearchState::Idle;

                let _ = self.events.send(ClientEvent::SearchResults { places });
            }
            Err(e) => {
                // Stale results never render beside an error
                self.results.lock().clear();
                *self.state.lock() = SearchState::Failed(e.to_string());

                let _ = self.events.send(ClientEvent::SearchFailed {
                    message: e.to_string(),
                });
            }
        }
    }
}
