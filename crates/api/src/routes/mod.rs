//! Route tree for `/api/v1`.

pub mod breakdown;
pub mod dispute;
pub mod health;
pub mod mechanic;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /breakdowns   creation, lifecycle, offers, photos
/// /mechanics    availability records, pings, nearby query
/// /disputes     raise / list / resolve
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/breakdowns", breakdown::router())
        .nest("/mechanics", mechanic::router())
        .nest("/disputes", dispute::router())
}
