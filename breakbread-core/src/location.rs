use async_trait::async_trait;
use thiserror::Error;

use crate::Coordinates;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location permission was not granted")]
    PermissionDenied,

    #[error("Location is unavailable: {0}")]
    Unavailable(String),
}

/// Represents a type that can resolve the device's current position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Requests permission if needed and returns the current coordinates.
    /// Denial surfaces as a typed error, never a crash.
    async fn current(&self) -> Result<Coordinates, LocationError>;
}
