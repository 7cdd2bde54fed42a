//! Dispatch coordinator: drives a breakdown from creation to ACCEPTED
//! (or CANCELLED for lack of a match).
//!
//! One long-lived Tokio task per searching breakdown runs the offer
//! rounds; an early acceptance or a rider cancellation cancels the
//! round's timer through a `CancellationToken` rather than interrupting
//! a blocking wait. All status movement funnels through the store's
//! compare-and-set transitions, so a cancellation racing an acceptance
//! resolves to exactly one terminal outcome.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use wayside_core::breakdown::{
    BreakdownRequest, BreakdownStatus, CancelReason, EmergencyCategory, StatusChange,
};
use wayside_core::error::CoreError;
use wayside_core::geo::GeoPoint;
use wayside_core::mechanic::MechanicStatus;
use wayside_core::types::DbId;
use wayside_events::{names, EventBus, PlatformEvent};
use wayside_store::Store;

use crate::availability::AvailabilityManager;
use crate::config::DispatchConfig;
use crate::index::GeospatialIndex;
use crate::offers::{Offer, OfferBoard};

pub struct DispatchCoordinator {
    store: Arc<Store>,
    index: Arc<GeospatialIndex>,
    availability: Arc<AvailabilityManager>,
    offers: Arc<OfferBoard>,
    bus: Arc<EventBus>,
    config: DispatchConfig,
    /// Cancellation handle for each breakdown's running round task.
    rounds: Mutex<HashMap<DbId, CancellationToken>>,
}

impl DispatchCoordinator {
    pub fn new(
        store: Arc<Store>,
        index: Arc<GeospatialIndex>,
        availability: Arc<AvailabilityManager>,
        offers: Arc<OfferBoard>,
        bus: Arc<EventBus>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            index,
            availability,
            offers,
            bus,
            config,
            rounds: Mutex::new(HashMap::new()),
        }
    }

    pub fn offer_board(&self) -> &Arc<OfferBoard> {
        &self.offers
    }

    // -----------------------------------------------------------------------
    // Creation and search
    // -----------------------------------------------------------------------

    /// Create a breakdown request and start dispatching it.
    ///
    /// The record is created PENDING, moved to SEARCHING, and a round
    /// task is spawned. Returns the SEARCHING record.
    pub async fn create_request(
        self: &Arc<Self>,
        rider_id: DbId,
        location: GeoPoint,
        address: Option<String>,
        category: EmergencyCategory,
        notes: Option<String>,
    ) -> Result<BreakdownRequest, CoreError> {
        let created = self
            .store
            .breakdowns
            .create(rider_id, location, address, category, notes)
            .await;
        self.bus.publish(
            PlatformEvent::new(names::BREAKDOWN_CREATED)
                .with_source("breakdown", created.id)
                .with_actor(rider_id)
                .with_payload(serde_json::json!({ "rider_id": rider_id })),
        );
        tracing::info!(
            breakdown_id = created.id,
            display_id = %created.display_id,
            rider_id,
            "Breakdown request created"
        );

        let searching = self
            .store
            .breakdowns
            .transition(
                created.id,
                BreakdownStatus::Pending,
                BreakdownStatus::Searching,
                StatusChange::default(),
            )
            .await?;
        self.bus.publish(
            PlatformEvent::new(names::BREAKDOWN_SEARCHING)
                .with_source("breakdown", created.id)
                .with_payload(serde_json::json!({ "rider_id": rider_id })),
        );

        let token = CancellationToken::new();
        self.rounds.lock().await.insert(created.id, token.clone());

        let this = Arc::clone(self);
        let (id, loc) = (searching.id, searching.location);
        tokio::spawn(async move {
            this.run_rounds(id, rider_id, loc, token).await;
        });

        Ok(searching)
    }

    /// One task per breakdown: query, offer, wait, widen, repeat.
    async fn run_rounds(
        self: Arc<Self>,
        breakdown_id: DbId,
        rider_id: DbId,
        location: GeoPoint,
        token: CancellationToken,
    ) {
        for round in 1..=self.config.max_rounds {
            // The record may have been accepted or cancelled between rounds.
            match self.store.breakdowns.find_by_id(breakdown_id).await {
                Some(b) if b.status == BreakdownStatus::Searching => {}
                _ => {
                    self.rounds.lock().await.remove(&breakdown_id);
                    return;
                }
            }

            let radius_km =
                self.config.search_radius_km * self.config.widen_factor.powi(round as i32 - 1);
            let declined = self.offers.declined(breakdown_id).await;
            let candidates: Vec<_> = self
                .index
                .query_nearby(location, radius_km, self.config.max_candidates, &[])
                .await
                .into_iter()
                .filter(|c| !declined.contains(&c.mechanic_id))
                .collect();

            if candidates.is_empty() {
                // The window still runs its course: a mechanic coming
                // online is picked up by the next (widened) round.
                tracing::info!(breakdown_id, round, radius_km, "No eligible candidates");
            } else {
                let now = chrono::Utc::now();
                let window = chrono::Duration::from_std(self.config.accept_window)
                    .unwrap_or_else(|_| chrono::Duration::seconds(20));
                let round_offers: Vec<Offer> = candidates
                    .iter()
                    .map(|c| Offer {
                        breakdown_id,
                        mechanic_id: c.mechanic_id,
                        round,
                        distance_km: c.distance_km,
                        sent_at: now,
                        expires_at: now + window,
                    })
                    .collect();
                self.offers
                    .open_round(breakdown_id, round, round_offers.clone())
                    .await;

                for offer in &round_offers {
                    let mechanic_user_id = self
                        .store
                        .mechanics
                        .find_by_id(offer.mechanic_id)
                        .await
                        .map(|m| m.user_id);
                    self.bus.publish(
                        PlatformEvent::new(names::BREAKDOWN_OFFER_SENT)
                            .with_source("breakdown", breakdown_id)
                            .with_payload(serde_json::json!({
                                "mechanic_id": offer.mechanic_id,
                                "mechanic_user_id": mechanic_user_id,
                                "round": round,
                                "distance_km": offer.distance_km,
                                "expires_at": offer.expires_at,
                            })),
                    );
                }
                tracing::info!(
                    breakdown_id,
                    round,
                    radius_km,
                    candidates = round_offers.len(),
                    "Offers broadcast"
                );
            }

            tokio::select! {
                _ = token.cancelled() => {
                    // Accepted or cancelled; that path owns the cleanup.
                    return;
                }
                _ = tokio::time::sleep(self.config.accept_window) => {
                    self.offers.expire_round(breakdown_id, round).await;
                    tracing::debug!(breakdown_id, round, "Offer window elapsed");
                }
            }
        }

        self.finish_unmatched(breakdown_id, rider_id).await;
    }

    /// Retry budget exhausted: close the breakdown out as unmatched.
    async fn finish_unmatched(&self, breakdown_id: DbId, rider_id: DbId) {
        let result = self
            .store
            .breakdowns
            .transition(
                breakdown_id,
                BreakdownStatus::Searching,
                BreakdownStatus::Cancelled,
                StatusChange {
                    cancel_reason: Some(CancelReason::NoMechanicAvailable),
                    ..Default::default()
                },
            )
            .await;

        self.rounds.lock().await.remove(&breakdown_id);
        match result {
            Ok(updated) => {
                self.offers.clear(breakdown_id).await;
                self.publish_cancelled(&updated);
                tracing::info!(
                    breakdown_id,
                    rider_id,
                    "Dispatch exhausted, no mechanic available"
                );
            }
            // Lost to a concurrent acceptance or cancellation — fine.
            Err(_) => {}
        }
    }

    // -----------------------------------------------------------------------
    // Acceptance / decline
    // -----------------------------------------------------------------------

    /// Process a mechanic's acceptance: the race-free hand-off.
    ///
    /// Reserves the mechanic first (the exclusivity gate), then CAS-binds
    /// the breakdown. Losing either race rolls back cleanly: a failed
    /// reservation leaves the breakdown searching; a failed binding
    /// releases the reservation.
    pub async fn accept(
        &self,
        breakdown_id: DbId,
        mechanic_id: DbId,
    ) -> Result<BreakdownRequest, CoreError> {
        if self
            .offers
            .offer_for(breakdown_id, mechanic_id)
            .await
            .is_none()
        {
            let current = self.store.breakdowns.get(breakdown_id).await?;
            return Err(no_offer_error(&current));
        }

        self.availability
            .try_reserve(mechanic_id, breakdown_id)
            .await?;

        let bound = self
            .store
            .breakdowns
            .transition(
                breakdown_id,
                BreakdownStatus::Searching,
                BreakdownStatus::Accepted,
                StatusChange {
                    mechanic_id: Some(mechanic_id),
                    ..Default::default()
                },
            )
            .await;

        match bound {
            Ok(updated) => {
                if let Some(token) = self.rounds.lock().await.remove(&breakdown_id) {
                    token.cancel();
                }
                self.offers.clear(breakdown_id).await;
                self.bus.publish(
                    PlatformEvent::new(names::BREAKDOWN_ACCEPTED)
                        .with_source("breakdown", breakdown_id)
                        .with_payload(serde_json::json!({
                            "rider_id": updated.rider_id,
                            "mechanic_id": mechanic_id,
                        })),
                );
                tracing::info!(breakdown_id, mechanic_id, "Breakdown accepted");
                Ok(updated)
            }
            Err(err) => {
                // The status CAS lost; hand the reservation back.
                let _ = self
                    .availability
                    .release(mechanic_id, MechanicStatus::Online)
                    .await;
                match self.store.breakdowns.find_by_id(breakdown_id).await {
                    Some(current) if current.status != BreakdownStatus::Searching => {
                        Err(no_offer_error(&current))
                    }
                    _ => Err(err),
                }
            }
        }
    }

    /// Record a decline: the candidate drops out of this and all later
    /// rounds for the breakdown.
    pub async fn decline(&self, breakdown_id: DbId, mechanic_id: DbId) -> Result<(), CoreError> {
        self.offers.mark_declined(breakdown_id, mechanic_id).await?;
        tracing::info!(breakdown_id, mechanic_id, "Offer declined");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    /// Rider-initiated cancellation, permitted while PENDING or SEARCHING.
    ///
    /// Runs under the record's entry lock, so it is atomic against a
    /// concurrent acceptance: whichever CAS lands first wins, the loser
    /// observes a Conflict.
    pub async fn cancel_by_rider(
        &self,
        breakdown_id: DbId,
        rider_id: DbId,
    ) -> Result<BreakdownRequest, CoreError> {
        let updated = self
            .store
            .breakdowns
            .mutate(breakdown_id, |b| {
                if b.rider_id != rider_id {
                    return Err(CoreError::Forbidden(
                        "only the requesting rider may cancel".into(),
                    ));
                }
                match b.status {
                    BreakdownStatus::Pending | BreakdownStatus::Searching => b.transition(
                        BreakdownStatus::Cancelled,
                        StatusChange {
                            cancel_reason: Some(CancelReason::RiderRequest),
                            ..Default::default()
                        },
                        chrono::Utc::now(),
                    ),
                    status if status.is_terminal() => Err(CoreError::Conflict(format!(
                        "breakdown {} is already {}",
                        b.display_id, status
                    ))),
                    _ => Err(CoreError::Conflict(format!(
                        "breakdown {} is already assigned",
                        b.display_id
                    ))),
                }
            })
            .await?;

        self.abort_rounds(breakdown_id).await;
        self.publish_cancelled(&updated);
        tracing::info!(breakdown_id, rider_id, "Breakdown cancelled by rider");
        Ok(updated)
    }

    /// Admin force-cancel from any non-terminal state. Releases the
    /// assigned mechanic when one is bound.
    pub async fn force_cancel(
        &self,
        breakdown_id: DbId,
        actor_user_id: DbId,
    ) -> Result<BreakdownRequest, CoreError> {
        let updated = self
            .store
            .breakdowns
            .mutate(breakdown_id, |b| {
                if b.status.is_terminal() {
                    return Err(CoreError::Conflict(format!(
                        "breakdown {} is already {}",
                        b.display_id, b.status
                    )));
                }
                b.transition(
                    BreakdownStatus::Cancelled,
                    StatusChange {
                        cancel_reason: Some(CancelReason::AdminAction),
                        ..Default::default()
                    },
                    chrono::Utc::now(),
                )
            })
            .await?;

        self.abort_rounds(breakdown_id).await;
        if let Some(mechanic_id) = updated.mechanic_id {
            let _ = self
                .availability
                .release(mechanic_id, MechanicStatus::Online)
                .await;
        }
        self.publish_cancelled(&updated);
        tracing::info!(breakdown_id, actor_user_id, "Breakdown force-cancelled");
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Post-acceptance lifecycle
    // -----------------------------------------------------------------------

    /// Apply a forward transition past ACCEPTED (EN_ROUTE through
    /// COMPLETED). Completion releases the mechanic and publishes the
    /// completion event carrying the final price.
    pub async fn advance_status(
        &self,
        breakdown_id: DbId,
        target: BreakdownStatus,
        change: StatusChange,
    ) -> Result<BreakdownRequest, CoreError> {
        if matches!(
            target,
            BreakdownStatus::Pending
                | BreakdownStatus::Searching
                | BreakdownStatus::Accepted
                | BreakdownStatus::Cancelled
        ) {
            return Err(CoreError::Validation(format!(
                "{target} is managed by dispatch and cannot be set through the status update"
            )));
        }

        let mut from = None;
        let updated = self
            .store
            .breakdowns
            .mutate(breakdown_id, |b| {
                from = Some(b.status);
                b.transition(target, change, chrono::Utc::now())
            })
            .await?;

        if target == BreakdownStatus::Completed {
            if let Some(mechanic_id) = updated.mechanic_id {
                let _ = self
                    .availability
                    .release(mechanic_id, MechanicStatus::Online)
                    .await;
            }
            self.bus.publish(
                PlatformEvent::new(names::BREAKDOWN_COMPLETED)
                    .with_source("breakdown", breakdown_id)
                    .with_payload(serde_json::json!({
                        "rider_id": updated.rider_id,
                        "mechanic_id": updated.mechanic_id,
                        "final_price": updated.final_price,
                    })),
            );
            tracing::info!(breakdown_id, "Breakdown completed");
        } else {
            self.bus.publish(
                PlatformEvent::new(names::BREAKDOWN_STATUS_CHANGED)
                    .with_source("breakdown", breakdown_id)
                    .with_payload(serde_json::json!({
                        "rider_id": updated.rider_id,
                        "mechanic_id": updated.mechanic_id,
                        "from": from,
                        "to": target,
                    })),
            );
        }
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Stop the round task (if any) and drop all offer state.
    async fn abort_rounds(&self, breakdown_id: DbId) {
        if let Some(token) = self.rounds.lock().await.remove(&breakdown_id) {
            token.cancel();
        }
        self.offers.clear(breakdown_id).await;
    }

    fn publish_cancelled(&self, breakdown: &BreakdownRequest) {
        self.bus.publish(
            PlatformEvent::new(names::BREAKDOWN_CANCELLED)
                .with_source("breakdown", breakdown.id)
                .with_payload(serde_json::json!({
                    "rider_id": breakdown.rider_id,
                    "mechanic_id": breakdown.mechanic_id,
                    "reason": breakdown.cancel_reason,
                })),
        );
    }
}

/// The error a mechanic sees when no live offer backs their call.
fn no_offer_error(current: &BreakdownRequest) -> CoreError {
    match current.status {
        BreakdownStatus::Cancelled => CoreError::Conflict(format!(
            "breakdown {} already cancelled",
            current.display_id
        )),
        BreakdownStatus::Pending | BreakdownStatus::Searching => CoreError::Conflict(format!(
            "no active offer for breakdown {}",
            current.display_id
        )),
        _ => CoreError::Conflict(format!(
            "breakdown {} already assigned",
            current.display_id
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
