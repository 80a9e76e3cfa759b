use async_trait::async_trait;
use thiserror::Error;

use crate::{Coordinates, PlaceData};

#[derive(Debug, Error)]
pub enum PlacesError {
    #[error("Failed to fetch places: {0}")]
    FetchError(String),

    #[error("Failed to parse places response: {0}")]
    ParseError(String),

    /// The search service refused the query
    #[error("Search was rejected: {0}")]
    Rejected(String),
}

/// Represents a type that can search an external places service.
///
/// Both query shapes are idempotent reads; results are never written back to
/// the authoritative store.
#[async_trait]
pub trait PlacesGateway: Send + Sync {
    /// Proximity search around the given coordinates
    async fn search_nearby(
        &self,
        coordinates: Coordinates,
        radius_in_meters: u32,
    ) -> Result<Vec<PlaceData>, PlacesError>;

    /// Free-text search biased towards the given coordinates
    async fn search_text(
        &self,
        query: &str,
        coordinates: Coordinates,
        radius_in_meters: u32,
    ) -> Result<Vec<PlaceData>, PlacesError>;
}
