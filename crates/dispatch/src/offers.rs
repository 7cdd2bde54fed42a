//! Outstanding offers per breakdown dispatch round.
//!
//! The board tracks, for each breakdown currently searching, which
//! mechanics hold an offer this round and which declined earlier.
//! Declines persist across rounds so widened searches skip them.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tokio::sync::RwLock;
use wayside_core::error::CoreError;
use wayside_core::types::{DbId, Timestamp};

/// An offer extended to one candidate mechanic.
#[derive(Debug, Clone, Serialize)]
pub struct Offer {
    pub breakdown_id: DbId,
    pub mechanic_id: DbId,
    pub round: u32,
    pub distance_km: f64,
    pub sent_at: Timestamp,
    pub expires_at: Timestamp,
}

#[derive(Default)]
struct RoundState {
    round: u32,
    offers: HashMap<DbId, Offer>,
    declined: HashSet<DbId>,
}

/// Interior-locked offer state, shared via `Arc`.
#[derive(Default)]
pub struct OfferBoard {
    rounds: RwLock<HashMap<DbId, RoundState>>,
}

impl OfferBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a round: replaces any previous round's offers for this
    /// breakdown, carrying the declined set forward.
    pub async fn open_round(&self, breakdown_id: DbId, round: u32, offers: Vec<Offer>) {
        let mut rounds = self.rounds.write().await;
        let state = rounds.entry(breakdown_id).or_default();
        state.round = round;
        state.offers = offers
            .into_iter()
            .map(|offer| (offer.mechanic_id, offer))
            .collect();
    }

    /// Mechanics that declined this breakdown in any round so far.
    pub async fn declined(&self, breakdown_id: DbId) -> HashSet<DbId> {
        self.rounds
            .read()
            .await
            .get(&breakdown_id)
            .map(|state| state.declined.clone())
            .unwrap_or_default()
    }

    /// The offer currently held by `mechanic_id` for this breakdown.
    pub async fn offer_for(&self, breakdown_id: DbId, mechanic_id: DbId) -> Option<Offer> {
        self.rounds
            .read()
            .await
            .get(&breakdown_id)
            .and_then(|state| state.offers.get(&mechanic_id))
            .cloned()
    }

    /// All offers currently held by a mechanic, across breakdowns.
    pub async fn offers_for_mechanic(&self, mechanic_id: DbId) -> Vec<Offer> {
        self.rounds
            .read()
            .await
            .values()
            .filter_map(|state| state.offers.get(&mechanic_id))
            .cloned()
            .collect()
    }

    /// Record a decline: the offer is withdrawn and the mechanic is
    /// excluded from later rounds of this breakdown.
    pub async fn mark_declined(
        &self,
        breakdown_id: DbId,
        mechanic_id: DbId,
    ) -> Result<(), CoreError> {
        let mut rounds = self.rounds.write().await;
        let state = rounds.get_mut(&breakdown_id).ok_or(CoreError::NotFound {
            entity: "Offer",
            id: breakdown_id,
        })?;
        if state.offers.remove(&mechanic_id).is_none() {
            return Err(CoreError::NotFound {
                entity: "Offer",
                id: breakdown_id,
            });
        }
        state.declined.insert(mechanic_id);
        Ok(())
    }

    /// Withdraw the offers of `round` when its window elapses, keeping
    /// the declined set. A newer round's offers are left alone.
    pub async fn expire_round(&self, breakdown_id: DbId, round: u32) {
        let mut rounds = self.rounds.write().await;
        if let Some(state) = rounds.get_mut(&breakdown_id) {
            if state.round == round {
                state.offers.clear();
            }
        }
    }

    /// Drop all offer state for a breakdown (assignment happened or the
    /// breakdown left SEARCHING for good).
    pub async fn clear(&self, breakdown_id: DbId) {
        self.rounds.write().await.remove(&breakdown_id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
