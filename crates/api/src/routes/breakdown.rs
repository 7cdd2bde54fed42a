//! Route definitions for the `/breakdowns` resource.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::breakdown;
use crate::state::AppState;

/// Routes mounted at `/breakdowns`.
///
/// ```text
/// POST   /               -> create_breakdown     (rider)
/// GET    /               -> list_breakdowns      (rider/mechanic/admin)
/// GET    /{id}           -> get_breakdown        (parties + admin)
/// PATCH  /{id}/status    -> update_status        (assigned mechanic, admin)
/// POST   /{id}/cancel    -> cancel_breakdown     (owner rider, admin)
/// POST   /{id}/accept    -> accept_offer         (mechanic with offer)
/// POST   /{id}/decline   -> decline_offer        (mechanic with offer)
/// POST   /{id}/photos    -> attach_photos        (owner rider)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(breakdown::create_breakdown).get(breakdown::list_breakdowns),
        )
        .route("/{id}", get(breakdown::get_breakdown))
        .route("/{id}/status", patch(breakdown::update_status))
        .route("/{id}/cancel", post(breakdown::cancel_breakdown))
        .route("/{id}/accept", post(breakdown::accept_offer))
        .route("/{id}/decline", post(breakdown::decline_offer))
        .route("/{id}/photos", post(breakdown::attach_photos))
}
