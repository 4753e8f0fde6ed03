//! Host geolocation capability.
//!
//! The panel only talks to [`Geolocator`], so any position source (a desktop
//! location service, an IP lookup, fixed coordinates) can be plugged in.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::LocationError, model::Coordinates};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Prompt,
    Denied,
}

#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    async fn query_permission(&self) -> PermissionState;

    async fn get_current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Serves a position known up front, e.g. from config or command-line flags.
#[derive(Debug, Clone, Default)]
pub struct FixedGeolocator {
    position: Option<Coordinates>,
}

impl FixedGeolocator {
    pub fn new(position: Option<Coordinates>) -> Self {
        Self { position }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn query_permission(&self) -> PermissionState {
        if self.position.is_some() {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }

    async fn get_current_position(&self) -> Result<Coordinates, LocationError> {
        self.position.ok_or(LocationError::PermissionDenied)
    }
}
