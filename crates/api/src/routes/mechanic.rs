//! Route definitions for the `/mechanics` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::mechanic;
use crate::state::AppState;

/// Routes mounted at `/mechanics`.
///
/// ```text
/// POST   /               -> register_mechanic    (mechanic/workshop)
/// GET    /me             -> get_own_mechanic
/// GET    /me/offers      -> get_own_offers       (mechanic)
/// PUT    /me/location    -> update_own_location
/// PUT    /me/status      -> update_own_status
/// PUT    /{id}/status    -> admin_update_status  (admin)
/// GET    /nearby         -> query_nearby         (public)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(mechanic::register_mechanic))
        .route("/me", get(mechanic::get_own_mechanic))
        .route("/me/offers", get(mechanic::get_own_offers))
        .route("/me/location", put(mechanic::update_own_location))
        .route("/me/status", put(mechanic::update_own_status))
        .route("/{id}/status", put(mechanic::admin_update_status))
        .route("/nearby", get(mechanic::query_nearby))
}
