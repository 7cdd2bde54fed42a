//! Canonical event-type names published on the bus.
//!
//! Dot-separated, `<entity>.<what happened>`. Payload fields are noted
//! where a subscriber depends on them.

/// A rider created a breakdown request. Payload: `rider_id`.
pub const BREAKDOWN_CREATED: &str = "breakdown.created";

/// Dispatch began searching for candidates. Payload: `rider_id`.
pub const BREAKDOWN_SEARCHING: &str = "breakdown.searching";

/// An offer went out to a candidate mechanic.
/// Payload: `mechanic_id`, `mechanic_user_id`, `round`, `distance_km`, `expires_at`.
pub const BREAKDOWN_OFFER_SENT: &str = "breakdown.offer_sent";

/// A mechanic won the assignment. Payload: `rider_id`, `mechanic_id`.
pub const BREAKDOWN_ACCEPTED: &str = "breakdown.accepted";

/// Any post-acceptance forward transition.
/// Payload: `rider_id`, `mechanic_id`, `from`, `to`.
pub const BREAKDOWN_STATUS_CHANGED: &str = "breakdown.status_changed";

/// The engagement finished. Payload: `rider_id`, `mechanic_id`, `final_price`.
pub const BREAKDOWN_COMPLETED: &str = "breakdown.completed";

/// The engagement ended without completion.
/// Payload: `rider_id`, `reason`, optional `mechanic_id`.
pub const BREAKDOWN_CANCELLED: &str = "breakdown.cancelled";

/// Reservation gate closed around a mechanic. Payload: `breakdown_id`.
pub const MECHANIC_RESERVED: &str = "mechanic.reserved";

/// Reservation released. Payload: `next_status`.
pub const MECHANIC_RELEASED: &str = "mechanic.released";

/// A mechanic toggled ONLINE/OFFLINE. Payload: `status`.
pub const MECHANIC_STATUS_CHANGED: &str = "mechanic.status_changed";

/// A dispute was opened. Payload: `raised_by`, `related_type`, `related_id`.
pub const DISPUTE_RAISED: &str = "dispute.raised";

/// A dispute was resolved or closed. Payload: `raised_by`, `final_status`.
pub const DISPUTE_RESOLVED: &str = "dispute.resolved";
