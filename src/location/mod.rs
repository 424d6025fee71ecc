//! Location acquisition boundary.
//!
//! Platform geolocation stacks live behind [`LocationProvider`]; the crate
//! ships a config-backed fixed provider. The latest fix is kept in a
//! single-writer [`LastFix`] store that the weather sampler reads; no fix
//! yet means the sampler idles.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use crate::config::LocationConfig;

/// Geographic coordinate in float degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Construct a coordinate only if both components are in range.
    pub fn validated(latitude: f64, longitude: f64) -> Option<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        if latitude.is_nan() || longitude.is_nan() {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }
}

/// Parameters for one on-demand fix request.
#[derive(Debug, Clone)]
pub struct FixRequest {
    pub high_accuracy: bool,
    /// Bounded wait for the fix.
    pub timeout: Duration,
    /// Maximum acceptable age of a cached fix.
    pub max_age: Duration,
}

impl FixRequest {
    pub fn from_config(config: &LocationConfig) -> Self {
        Self {
            high_accuracy: config.high_accuracy,
            timeout: Duration::from_secs(config.fix_timeout_seconds),
            max_age: Duration::from_secs(config.max_fix_age_seconds),
        }
    }
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("No position available")]
    Unavailable,

    #[error("Timed out waiting for a fix")]
    Timeout,
}

/// On-demand current-fix source. No continuous tracking.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_fix(&self, request: &FixRequest) -> Result<Coordinate, LocationError>;
}

/// Provider backed by a fixed coordinate from configuration.
pub struct FixedLocationProvider {
    coordinate: Coordinate,
}

impl FixedLocationProvider {
    /// Present only when the config carries a valid coordinate pair.
    pub fn from_config(config: &LocationConfig) -> Option<Self> {
        let (latitude, longitude) = (config.latitude?, config.longitude?);
        Coordinate::validated(latitude, longitude).map(|coordinate| Self { coordinate })
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn current_fix(&self, _request: &FixRequest) -> Result<Coordinate, LocationError> {
        Ok(self.coordinate)
    }
}

/// Last known coordinate. Single writer (whoever acquired the fix),
/// many readers.
#[derive(Clone, Default)]
pub struct LastFix {
    inner: Arc<RwLock<Option<Coordinate>>>,
}

impl LastFix {
    pub fn set(&self, coordinate: Coordinate) {
        *self.inner.write() = Some(coordinate);
    }

    pub fn get(&self) -> Option<Coordinate> {
        *self.inner.read()
    }
}
