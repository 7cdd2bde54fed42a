//! Route definitions for the `/disputes` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::dispute;
use crate::state::AppState;

/// Routes mounted at `/disputes`.
///
/// ```text
/// POST   /               -> raise_dispute        (any authenticated)
/// GET    /               -> list_disputes        (admin: all, others: own)
/// GET    /{id}           -> get_dispute          (raiser, admin)
/// POST   /{id}/resolve   -> resolve_dispute      (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(dispute::raise_dispute).get(dispute::list_disputes))
        .route("/{id}", get(dispute::get_dispute))
        .route("/{id}/resolve", post(dispute::resolve_dispute))
}
