//! Mechanic availability manager: the one-active-job exclusivity gate.
//!
//! Wraps the mechanic store's per-mechanic CAS and keeps the geospatial
//! index eligibility flag and the event bus in step with every change.

use std::sync::Arc;

use wayside_core::error::CoreError;
use wayside_core::geo::GeoPoint;
use wayside_core::mechanic::{Mechanic, MechanicStatus};
use wayside_core::types::{DbId, Timestamp};
use wayside_events::{names, EventBus, PlatformEvent};
use wayside_store::MechanicRepo;

use crate::index::GeospatialIndex;

pub struct AvailabilityManager {
    mechanics: Arc<MechanicRepo>,
    index: Arc<GeospatialIndex>,
    bus: Arc<EventBus>,
}

impl AvailabilityManager {
    pub fn new(
        mechanics: Arc<MechanicRepo>,
        index: Arc<GeospatialIndex>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            mechanics,
            index,
            bus,
        }
    }

    /// Atomically transition a mechanic ONLINE -> BUSY.
    ///
    /// Fails with `Conflict` if the mechanic is not currently ONLINE —
    /// of N concurrent reservation attempts exactly one succeeds.
    pub async fn try_reserve(
        &self,
        mechanic_id: DbId,
        breakdown_id: DbId,
    ) -> Result<(), CoreError> {
        let reserved = self
            .mechanics
            .compare_and_set_status(mechanic_id, MechanicStatus::Online, MechanicStatus::Busy)
            .await?;
        if !reserved {
            let current = self.mechanics.load_status(mechanic_id).await?;
            return Err(CoreError::Conflict(format!(
                "mechanic {mechanic_id} is {current}, not available for reservation"
            )));
        }

        self.index.set_available(mechanic_id, false).await;
        self.bus.publish(
            PlatformEvent::new(names::MECHANIC_RESERVED)
                .with_source("mechanic", mechanic_id)
                .with_payload(serde_json::json!({ "breakdown_id": breakdown_id })),
        );
        tracing::debug!(mechanic_id, breakdown_id, "Mechanic reserved");
        Ok(())
    }

    /// Release a BUSY mechanic back to `next` (ONLINE or OFFLINE).
    ///
    /// Returns whether the swap happened; a false return means the
    /// mechanic was not BUSY, which callers treat as already-released.
    pub async fn release(
        &self,
        mechanic_id: DbId,
        next: MechanicStatus,
    ) -> Result<bool, CoreError> {
        debug_assert!(next != MechanicStatus::Busy);
        let released = self
            .mechanics
            .compare_and_set_status(mechanic_id, MechanicStatus::Busy, next)
            .await?;
        if !released {
            tracing::warn!(mechanic_id, "Release requested for a mechanic that is not BUSY");
            return Ok(false);
        }

        self.index
            .set_available(mechanic_id, next.is_online())
            .await;
        self.bus.publish(
            PlatformEvent::new(names::MECHANIC_RELEASED)
                .with_source("mechanic", mechanic_id)
                .with_payload(serde_json::json!({ "next_status": next.as_str() })),
        );
        tracing::debug!(mechanic_id, next = %next, "Mechanic released");
        Ok(true)
    }

    /// Service a mechanic's own ONLINE/OFFLINE toggle.
    ///
    /// BUSY cannot be requested here — it is owned by the reservation
    /// gate — and a BUSY mechanic cannot self-transition until released.
    pub async fn set_status(
        &self,
        mechanic_id: DbId,
        target: MechanicStatus,
    ) -> Result<Mechanic, CoreError> {
        if target == MechanicStatus::Busy {
            return Err(CoreError::Validation(
                "BUSY is assigned by dispatch and cannot be set directly".into(),
            ));
        }

        loop {
            let current = self.mechanics.load_status(mechanic_id).await?;
            if current == MechanicStatus::Busy {
                return Err(CoreError::Conflict(format!(
                    "mechanic {mechanic_id} is on an active job"
                )));
            }
            if current == target {
                break;
            }
            if self
                .mechanics
                .compare_and_set_status(mechanic_id, current, target)
                .await?
            {
                break;
            }
            // Lost a race with a concurrent toggle or reservation; re-read.
        }

        self.index
            .set_available(mechanic_id, target.is_online())
            .await;
        self.bus.publish(
            PlatformEvent::new(names::MECHANIC_STATUS_CHANGED)
                .with_source("mechanic", mechanic_id)
                .with_payload(serde_json::json!({ "status": target.as_str() })),
        );
        self.mechanics.get(mechanic_id).await
    }

    /// Record a live location ping and mirror it into the index.
    pub async fn update_location(
        &self,
        mechanic_id: DbId,
        point: GeoPoint,
        observed_at: Timestamp,
    ) -> Result<Mechanic, CoreError> {
        let snapshot = self
            .mechanics
            .update_location(mechanic_id, point, observed_at)
            .await?;
        self.index
            .upsert(
                mechanic_id,
                point,
                observed_at,
                snapshot.skills.clone(),
                snapshot.status.is_online(),
            )
            .await;
        tracing::debug!(mechanic_id, lat = point.lat, lng = point.lng, "Location updated");
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    struct Fixture {
        manager: AvailabilityManager,
        mechanics: Arc<MechanicRepo>,
        index: Arc<GeospatialIndex>,
    }

    fn fixture() -> Fixture {
        let mechanics = Arc::new(MechanicRepo::default());
        let index = Arc::new(GeospatialIndex::new());
        let bus = Arc::new(EventBus::default());
        Fixture {
            manager: AvailabilityManager::new(
                Arc::clone(&mechanics),
                Arc::clone(&index),
                bus,
            ),
            mechanics,
            index,
        }
    }

    async fn online_mechanic(f: &Fixture) -> DbId {
        let m = f
            .mechanics
            .create(10, "Lou".into(), vec![])
            .await
            .unwrap();
        f.manager
            .update_location(m.id, GeoPoint::new(44.97, -93.26).unwrap(), chrono::Utc::now())
            .await
            .unwrap();
        f.manager
            .set_status(m.id, MechanicStatus::Online)
            .await
            .unwrap();
        m.id
    }

    #[tokio::test]
    async fn reserve_takes_mechanic_out_of_queries() {
        let f = fixture();
        let id = online_mechanic(&f).await;
        let origin = GeoPoint::new(44.97, -93.26).unwrap();

        assert_eq!(f.index.query_nearby(origin, 15.0, 10, &[]).await.len(), 1);

        f.manager.try_reserve(id, 1).await.unwrap();
        assert!(f.index.query_nearby(origin, 15.0, 10, &[]).await.is_empty());
        assert_eq!(
            f.mechanics.load_status(id).await.unwrap(),
            MechanicStatus::Busy
        );
    }

    #[tokio::test]
    async fn second_reserve_conflicts_until_release() {
        let f = fixture();
        let id = online_mechanic(&f).await;

        f.manager.try_reserve(id, 1).await.unwrap();
        let err = f.manager.try_reserve(id, 2).await.unwrap_err();
        assert_matches!(err, CoreError::Conflict(_));

        assert!(f.manager.release(id, MechanicStatus::Online).await.unwrap());
        f.manager.try_reserve(id, 2).await.unwrap();
    }

    #[tokio::test]
    async fn release_restores_query_eligibility() {
        let f = fixture();
        let id = online_mechanic(&f).await;
        let origin = GeoPoint::new(44.97, -93.26).unwrap();

        f.manager.try_reserve(id, 1).await.unwrap();
        f.manager.release(id, MechanicStatus::Online).await.unwrap();
        assert_eq!(f.index.query_nearby(origin, 15.0, 10, &[]).await.len(), 1);

        // Releasing to OFFLINE keeps the mechanic invisible.
        f.manager.try_reserve(id, 2).await.unwrap();
        f.manager.release(id, MechanicStatus::Offline).await.unwrap();
        assert!(f.index.query_nearby(origin, 15.0, 10, &[]).await.is_empty());
    }

    #[tokio::test]
    async fn busy_cannot_be_set_directly() {
        let f = fixture();
        let id = online_mechanic(&f).await;

        let err = f
            .manager
            .set_status(id, MechanicStatus::Busy)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[tokio::test]
    async fn busy_mechanic_cannot_self_toggle() {
        let f = fixture();
        let id = online_mechanic(&f).await;
        f.manager.try_reserve(id, 1).await.unwrap();

        let err = f
            .manager
            .set_status(id, MechanicStatus::Offline)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Conflict(_));
    }

    #[tokio::test]
    async fn reserve_offline_mechanic_conflicts() {
        let f = fixture();
        let m = f.mechanics.create(10, "Lou".into(), vec![]).await.unwrap();

        let err = f.manager.try_reserve(m.id, 1).await.unwrap_err();
        assert_matches!(err, CoreError::Conflict(_));
    }
}
