//! Indexed in-memory stores for the dispatch engine.
//!
//! Each repository keys records by id and exposes atomic
//! compare-and-set transitions instead of a shared mutable collection:
//! breakdown records sit behind per-entry locks, mechanic availability
//! behind a per-entry atomic. Unrelated records never contend.
//!
//! Durable persistence of profile/catalog/payment records belongs to an
//! external collaborator and is out of scope here.

pub mod breakdowns;
pub mod disputes;
pub mod mechanics;

pub use breakdowns::{BreakdownFilter, BreakdownRepo};
pub use disputes::{DisputeFilter, DisputeRepo};
pub use mechanics::MechanicRepo;

use std::sync::Arc;

/// All repositories bundled for shared ownership via `Arc<Store>`.
///
/// Individual repositories are themselves behind `Arc` so components
/// that only need one of them (e.g. the availability manager and the
/// mechanic repo) can hold it directly.
#[derive(Default)]
pub struct Store {
    pub breakdowns: Arc<BreakdownRepo>,
    pub mechanics: Arc<MechanicRepo>,
    pub disputes: Arc<DisputeRepo>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }
}
