use std::sync::Arc;

use wayside_dispatch::{AvailabilityManager, DispatchCoordinator, GeospatialIndex};
use wayside_events::EventBus;
use wayside_gateway::BlobStore;
use wayside_store::Store;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable; every field is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// In-memory entity stores.
    pub store: Arc<Store>,
    /// Geospatial index over mechanic positions.
    pub index: Arc<GeospatialIndex>,
    /// Mechanic availability manager (the exclusivity gate).
    pub availability: Arc<AvailabilityManager>,
    /// Dispatch coordinator driving breakdown lifecycles.
    pub coordinator: Arc<DispatchCoordinator>,
    /// Centralized event bus.
    pub bus: Arc<EventBus>,
    /// Blob storage for breakdown photos.
    pub blobs: Arc<dyn BlobStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
