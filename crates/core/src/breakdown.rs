//! Breakdown request lifecycle: the status state machine and its guards.
//!
//! The lifecycle is a strict forward chain with a single escape edge to
//! CANCELLED from every non-terminal state:
//!
//! ```text
//! PENDING -> SEARCHING -> ACCEPTED -> EN_ROUTE -> ARRIVED -> DIAGNOSING
//!         -> ESTIMATE_SENT -> ESTIMATE_APPROVED -> IN_PROGRESS -> COMPLETED
//! ```
//!
//! No skipping, no backward movement. Transitions mutate the record in
//! place; side effects (notifications, mechanic release, payment capture)
//! are the caller's responsibility and travel over the event bus.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geo::GeoPoint;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a breakdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakdownStatus {
    Pending,
    Searching,
    Accepted,
    EnRoute,
    Arrived,
    Diagnosing,
    EstimateSent,
    EstimateApproved,
    InProgress,
    Completed,
    Cancelled,
}

impl BreakdownStatus {
    /// Wire-format name (matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Searching => "SEARCHING",
            Self::Accepted => "ACCEPTED",
            Self::EnRoute => "EN_ROUTE",
            Self::Arrived => "ARRIVED",
            Self::Diagnosing => "DIAGNOSING",
            Self::EstimateSent => "ESTIMATE_SENT",
            Self::EstimateApproved => "ESTIMATE_APPROVED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// The next state on the forward chain, if any.
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Searching),
            Self::Searching => Some(Self::Accepted),
            Self::Accepted => Some(Self::EnRoute),
            Self::EnRoute => Some(Self::Arrived),
            Self::Arrived => Some(Self::Diagnosing),
            Self::Diagnosing => Some(Self::EstimateSent),
            Self::EstimateSent => Some(Self::EstimateApproved),
            Self::EstimateApproved => Some(Self::InProgress),
            Self::InProgress => Some(Self::Completed),
            Self::Completed | Self::Cancelled => None,
        }
    }

    /// COMPLETED and CANCELLED permit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the edge `self -> target` exists in the transition table.
    pub fn can_transition_to(self, target: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if target == Self::Cancelled {
            return true;
        }
        self.successor() == Some(target)
    }
}

impl std::fmt::Display for BreakdownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Supporting enums
// ---------------------------------------------------------------------------

/// What went wrong with the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmergencyCategory {
    FlatTire,
    DeadBattery,
    Engine,
    Lockout,
    OutOfFuel,
    Accident,
    Other,
}

/// Why a breakdown ended in CANCELLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelReason {
    /// The retry budget was exhausted without a single acceptance.
    NoMechanicAvailable,
    /// The rider withdrew the request.
    RiderRequest,
    /// An administrator force-cancelled the engagement.
    AdminAction,
}

/// Reference to a photo stored through the blob-storage capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoRef {
    pub id: String,
    pub file_name: String,
    pub url: String,
    pub uploaded_at: Timestamp,
}

// ---------------------------------------------------------------------------
// BreakdownRequest
// ---------------------------------------------------------------------------

/// A rider's single roadside-assistance incident.
///
/// Prices are integer cents. `mechanic_id` is set exactly when the status
/// has progressed past SEARCHING; once the record reaches a terminal
/// status it is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownRequest {
    pub id: DbId,
    /// Human-readable reference, e.g. `WS-000042`.
    pub display_id: String,
    pub rider_id: DbId,
    pub mechanic_id: Option<DbId>,
    pub status: BreakdownStatus,
    pub location: GeoPoint,
    pub address: Option<String>,
    pub category: EmergencyCategory,
    pub notes: Option<String>,
    /// Ordered by upload time.
    pub photos: Vec<PhotoRef>,
    pub estimated_price: Option<i64>,
    pub final_price: Option<i64>,
    pub cancel_reason: Option<CancelReason>,
    pub created_at: Timestamp,
    pub accepted_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// Extra data accompanying a status transition.
///
/// Only the fields relevant to the target status are read; the rest are
/// ignored.
#[derive(Debug, Default, Clone)]
pub struct StatusChange {
    pub mechanic_id: Option<DbId>,
    pub estimated_price: Option<i64>,
    pub final_price: Option<i64>,
    pub cancel_reason: Option<CancelReason>,
}

/// Render the human-readable display id for a breakdown id.
pub fn display_id(id: DbId) -> String {
    format!("WS-{id:06}")
}

impl BreakdownRequest {
    /// A freshly created request, status PENDING.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: DbId,
        rider_id: DbId,
        location: GeoPoint,
        address: Option<String>,
        category: EmergencyCategory,
        notes: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            display_id: display_id(id),
            rider_id,
            mechanic_id: None,
            status: BreakdownStatus::Pending,
            location,
            address,
            category,
            notes,
            photos: Vec::new(),
            estimated_price: None,
            final_price: None,
            cancel_reason: None,
            created_at: now,
            accepted_at: None,
            completed_at: None,
        }
    }

    /// Validate and apply a status transition, enforcing the guards:
    ///
    /// - the edge must exist in the transition table;
    /// - ACCEPTED binds the mechanic from `change` and stamps `accepted_at`;
    /// - ESTIMATE_SENT records `estimated_price` (required);
    /// - ESTIMATE_APPROVED requires a previously recorded estimate;
    /// - COMPLETED records `final_price` (required) and stamps `completed_at`;
    /// - CANCELLED records the cancel reason.
    pub fn transition(
        &mut self,
        target: BreakdownStatus,
        change: StatusChange,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        if !self.status.can_transition_to(target) {
            return Err(CoreError::Validation(format!(
                "invalid status transition {} -> {}",
                self.status, target
            )));
        }

        match target {
            BreakdownStatus::Accepted => {
                let mechanic_id = change.mechanic_id.ok_or_else(|| {
                    CoreError::Validation("ACCEPTED requires a mechanic to bind".into())
                })?;
                self.mechanic_id = Some(mechanic_id);
                self.accepted_at = Some(now);
            }
            BreakdownStatus::EstimateSent => {
                if let Some(price) = change.estimated_price {
                    validate_price(price, "estimated_price")?;
                    self.estimated_price = Some(price);
                }
                if self.estimated_price.is_none() {
                    return Err(CoreError::Validation(
                        "ESTIMATE_SENT requires an estimated price".into(),
                    ));
                }
            }
            BreakdownStatus::EstimateApproved => {
                if self.estimated_price.is_none() {
                    return Err(CoreError::Validation(
                        "ESTIMATE_APPROVED requires a previously recorded estimate".into(),
                    ));
                }
            }
            BreakdownStatus::Completed => {
                if let Some(price) = change.final_price {
                    validate_price(price, "final_price")?;
                    self.final_price = Some(price);
                }
                if self.final_price.is_none() {
                    return Err(CoreError::Validation(
                        "COMPLETED requires a final price".into(),
                    ));
                }
                self.completed_at = Some(now);
            }
            BreakdownStatus::Cancelled => {
                self.cancel_reason = Some(change.cancel_reason.unwrap_or(CancelReason::RiderRequest));
            }
            _ => {}
        }

        self.status = target;
        Ok(())
    }
}

fn validate_price(cents: i64, field: &str) -> Result<(), CoreError> {
    if cents <= 0 {
        return Err(CoreError::Validation(format!(
            "{field} must be a positive amount in cents, got {cents}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(now: Timestamp) -> BreakdownRequest {
        BreakdownRequest::new(
            1,
            100,
            GeoPoint::new(44.97, -93.26).unwrap(),
            Some("394 & Penn Ave".into()),
            EmergencyCategory::FlatTire,
            None,
            now,
        )
    }

    fn advance(b: &mut BreakdownRequest, target: BreakdownStatus, change: StatusChange) {
        let now = chrono::Utc::now();
        b.transition(target, change, now)
            .unwrap_or_else(|e| panic!("transition to {target} failed: {e}"));
    }

    #[test]
    fn new_request_is_pending_with_display_id() {
        let b = sample(chrono::Utc::now());
        assert_eq!(b.status, BreakdownStatus::Pending);
        assert_eq!(b.display_id, "WS-000001");
        assert!(b.mechanic_id.is_none());
    }

    #[test]
    fn full_forward_chain_is_legal() {
        let mut b = sample(chrono::Utc::now());
        advance(&mut b, BreakdownStatus::Searching, StatusChange::default());
        advance(
            &mut b,
            BreakdownStatus::Accepted,
            StatusChange {
                mechanic_id: Some(7),
                ..Default::default()
            },
        );
        advance(&mut b, BreakdownStatus::EnRoute, StatusChange::default());
        advance(&mut b, BreakdownStatus::Arrived, StatusChange::default());
        advance(&mut b, BreakdownStatus::Diagnosing, StatusChange::default());
        advance(
            &mut b,
            BreakdownStatus::EstimateSent,
            StatusChange {
                estimated_price: Some(12_500),
                ..Default::default()
            },
        );
        advance(
            &mut b,
            BreakdownStatus::EstimateApproved,
            StatusChange::default(),
        );
        advance(&mut b, BreakdownStatus::InProgress, StatusChange::default());
        advance(
            &mut b,
            BreakdownStatus::Completed,
            StatusChange {
                final_price: Some(13_000),
                ..Default::default()
            },
        );

        assert_eq!(b.status, BreakdownStatus::Completed);
        assert_eq!(b.mechanic_id, Some(7));
        assert_eq!(b.estimated_price, Some(12_500));
        assert_eq!(b.final_price, Some(13_000));
        assert!(b.accepted_at.is_some());
        assert!(b.completed_at.is_some());
    }

    #[test]
    fn skipping_a_state_is_rejected() {
        let mut b = sample(chrono::Utc::now());
        let err = b
            .transition(
                BreakdownStatus::Accepted,
                StatusChange {
                    mechanic_id: Some(7),
                    ..Default::default()
                },
                chrono::Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(b.status, BreakdownStatus::Pending);
    }

    #[test]
    fn backward_movement_is_rejected() {
        let mut b = sample(chrono::Utc::now());
        advance(&mut b, BreakdownStatus::Searching, StatusChange::default());
        let err = b
            .transition(
                BreakdownStatus::Pending,
                StatusChange::default(),
                chrono::Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn cancel_reachable_from_any_non_terminal_state() {
        for stop_at in [
            BreakdownStatus::Pending,
            BreakdownStatus::Searching,
            BreakdownStatus::Accepted,
            BreakdownStatus::EnRoute,
            BreakdownStatus::Arrived,
            BreakdownStatus::Diagnosing,
            BreakdownStatus::EstimateSent,
            BreakdownStatus::EstimateApproved,
            BreakdownStatus::InProgress,
        ] {
            let mut b = sample(chrono::Utc::now());
            // Walk forward to the target state.
            while b.status != stop_at {
                let next = b.status.successor().unwrap();
                advance(
                    &mut b,
                    next,
                    StatusChange {
                        mechanic_id: Some(7),
                        estimated_price: Some(10_000),
                        ..Default::default()
                    },
                );
            }
            b.transition(
                BreakdownStatus::Cancelled,
                StatusChange {
                    cancel_reason: Some(CancelReason::AdminAction),
                    ..Default::default()
                },
                chrono::Utc::now(),
            )
            .unwrap_or_else(|e| panic!("cancel from {stop_at} failed: {e}"));
            assert_eq!(b.status, BreakdownStatus::Cancelled);
            assert_eq!(b.cancel_reason, Some(CancelReason::AdminAction));
        }
    }

    #[test]
    fn terminal_states_are_immutable() {
        let mut b = sample(chrono::Utc::now());
        advance(&mut b, BreakdownStatus::Searching, StatusChange::default());
        advance(
            &mut b,
            BreakdownStatus::Cancelled,
            StatusChange::default(),
        );

        for target in [
            BreakdownStatus::Searching,
            BreakdownStatus::Accepted,
            BreakdownStatus::Cancelled,
            BreakdownStatus::Completed,
        ] {
            assert!(
                b.transition(target, StatusChange::default(), chrono::Utc::now())
                    .is_err(),
                "transition out of CANCELLED to {target} must fail"
            );
        }
    }

    #[test]
    fn accepted_without_mechanic_is_rejected() {
        let mut b = sample(chrono::Utc::now());
        advance(&mut b, BreakdownStatus::Searching, StatusChange::default());
        let err = b
            .transition(
                BreakdownStatus::Accepted,
                StatusChange::default(),
                chrono::Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        // The record must be untouched after a rejected transition.
        assert_eq!(b.status, BreakdownStatus::Searching);
        assert!(b.mechanic_id.is_none());
    }

    #[test]
    fn estimate_approved_requires_recorded_estimate() {
        let mut b = sample(chrono::Utc::now());
        advance(&mut b, BreakdownStatus::Searching, StatusChange::default());
        advance(
            &mut b,
            BreakdownStatus::Accepted,
            StatusChange {
                mechanic_id: Some(7),
                ..Default::default()
            },
        );
        advance(&mut b, BreakdownStatus::EnRoute, StatusChange::default());
        advance(&mut b, BreakdownStatus::Arrived, StatusChange::default());
        advance(&mut b, BreakdownStatus::Diagnosing, StatusChange::default());

        // ESTIMATE_SENT without a price fails, leaving the status alone.
        let err = b
            .transition(
                BreakdownStatus::EstimateSent,
                StatusChange::default(),
                chrono::Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(b.status, BreakdownStatus::Diagnosing);
    }

    #[test]
    fn completed_requires_final_price() {
        let mut b = sample(chrono::Utc::now());
        advance(&mut b, BreakdownStatus::Searching, StatusChange::default());
        advance(
            &mut b,
            BreakdownStatus::Accepted,
            StatusChange {
                mechanic_id: Some(7),
                ..Default::default()
            },
        );
        advance(&mut b, BreakdownStatus::EnRoute, StatusChange::default());
        advance(&mut b, BreakdownStatus::Arrived, StatusChange::default());
        advance(&mut b, BreakdownStatus::Diagnosing, StatusChange::default());
        advance(
            &mut b,
            BreakdownStatus::EstimateSent,
            StatusChange {
                estimated_price: Some(9_900),
                ..Default::default()
            },
        );
        advance(
            &mut b,
            BreakdownStatus::EstimateApproved,
            StatusChange::default(),
        );
        advance(&mut b, BreakdownStatus::InProgress, StatusChange::default());

        let err = b
            .transition(
                BreakdownStatus::Completed,
                StatusChange::default(),
                chrono::Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(b.completed_at.is_none());
    }

    #[test]
    fn non_positive_prices_rejected() {
        let mut b = sample(chrono::Utc::now());
        advance(&mut b, BreakdownStatus::Searching, StatusChange::default());
        advance(
            &mut b,
            BreakdownStatus::Accepted,
            StatusChange {
                mechanic_id: Some(7),
                ..Default::default()
            },
        );
        advance(&mut b, BreakdownStatus::EnRoute, StatusChange::default());
        advance(&mut b, BreakdownStatus::Arrived, StatusChange::default());
        advance(&mut b, BreakdownStatus::Diagnosing, StatusChange::default());

        let err = b
            .transition(
                BreakdownStatus::EstimateSent,
                StatusChange {
                    estimated_price: Some(0),
                    ..Default::default()
                },
                chrono::Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn status_wire_names_round_trip() {
        for status in [
            BreakdownStatus::Pending,
            BreakdownStatus::EnRoute,
            BreakdownStatus::EstimateApproved,
            BreakdownStatus::Cancelled,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: BreakdownStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }
}
