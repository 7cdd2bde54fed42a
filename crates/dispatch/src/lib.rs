//! The dispatch engine: geospatial candidate discovery, mechanic
//! exclusivity, offer rounds, and the race-free hand-off that binds one
//! mechanic to one breakdown.
//!
//! Components, leaves first:
//!
//! - [`index::GeospatialIndex`] — positions + proximity queries.
//! - [`availability::AvailabilityManager`] — the ONLINE/OFFLINE/BUSY
//!   gate, one active job per mechanic.
//! - [`offers::OfferBoard`] — outstanding offers per breakdown round.
//! - [`coordinator::DispatchCoordinator`] — drives a breakdown from
//!   creation to ACCEPTED or CANCELLED, orchestrating the other three.

pub mod availability;
pub mod config;
pub mod coordinator;
pub mod index;
pub mod offers;

pub use availability::AvailabilityManager;
pub use config::DispatchConfig;
pub use coordinator::DispatchCoordinator;
pub use index::GeospatialIndex;
pub use offers::{Offer, OfferBoard};
