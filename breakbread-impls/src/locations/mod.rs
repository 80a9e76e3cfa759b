use async_trait::async_trait;

use breakbread_core::{Coordinates, LocationError, LocationProvider};

/// A provider for hosts that resolve coordinates themselves.
/// Device location is a platform concern, so the host hands in the result.
pub struct StaticLocation(Coordinates);

impl StaticLocation {
    pub fn new(coordinates: Coordinates) -> Self {
        Self(coordinates)
    }
}

#[async_trait]
impl LocationProvider for StaticLocation {
    async fn current(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

/// A provider reporting that the user denied location access.
/// Useful as a null object on hosts without a location capability.
pub struct DeniedLocation;

#[async_trait]
impl LocationProvider for DeniedLocation {
    async fn current(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}
