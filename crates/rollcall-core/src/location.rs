//! Acquiring the caller's current position.
//!
//! Reading a device sensor is an effect owned by whoever embeds the core. The
//! admission controller and registry only see this trait, so tests can hand
//! them a fixed coordinate.

use async_trait::async_trait;
use thiserror::Error;

use crate::geo::Coordinate;

/// Why a position could not be obtained.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    /// The user refused location access.
    #[error("Location permission denied")]
    PermissionDenied,

    /// The position could not be determined.
    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// Result type for location lookups.
pub type LocationResult<T> = std::result::Result<T, LocationError>;

/// Something that can report where the caller currently is.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// The caller's current position.
    async fn current_location(&self) -> LocationResult<Coordinate>;
}

/// A provider that always reports the same outcome.
///
/// Used when the position was measured elsewhere (the client device sent it
/// along with the scan) and in tests.
#[derive(Debug, Clone)]
pub struct FixedLocation(LocationResult<Coordinate>);

impl FixedLocation {
    /// Always reports `coordinate`.
    #[must_use]
    pub const fn at(coordinate: Coordinate) -> Self {
        Self(Ok(coordinate))
    }

    /// Always fails with `error`.
    #[must_use]
    pub const fn failing(error: LocationError) -> Self {
        Self(Err(error))
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> LocationResult<Coordinate> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_location_reports_coordinate() {
        let here = Coordinate::new(1.0, 2.0).unwrap();
        let provider = FixedLocation::at(here);
        assert_eq!(provider.current_location().await, Ok(here));
    }

    #[test]
    fn test_fixed_location_reports_error() {
        let provider = FixedLocation::failing(LocationError::PermissionDenied);
        assert_eq!(
            tokio_test::block_on(provider.current_location()),
            Err(LocationError::PermissionDenied)
        );
    }
}
