//! Handlers for the `/mechanics` resource: availability records, live
//! location/status pings, outstanding offers, and the public proximity
//! query.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;
use wayside_core::error::CoreError;
use wayside_core::geo::GeoPoint;
use wayside_core::mechanic::{Mechanic, MechanicStatus};
use wayside_core::types::DbId;
use wayside_dispatch::Offer;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::policy::{authorize, Permission};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body for `POST /mechanics`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterMechanicBody {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    /// Advertised skills, e.g. `["battery", "towing"]`.
    #[serde(default)]
    pub skills: Vec<String>,
}

/// Body for `PUT /mechanics/me/location`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLocationBody {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

/// Body for the status update endpoints.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: MechanicStatus,
}

/// Query parameters for `GET /mechanics/nearby`.
#[derive(Debug, Deserialize, Validate)]
pub struct NearbyQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    /// Search radius in km; defaults to 15.
    #[validate(range(min = 0.1, max = 500.0))]
    pub radius: Option<f64>,
    pub limit: Option<usize>,
}

/// Default search radius for the nearby query, in km.
const DEFAULT_NEARBY_RADIUS_KM: f64 = 15.0;

/// Default / maximum result counts for the nearby query.
const DEFAULT_NEARBY_LIMIT: usize = 20;
const MAX_NEARBY_LIMIT: usize = 100;

/// One proximity-query result: the mechanic plus their distance.
#[derive(Debug, Serialize)]
pub struct NearbyMechanicItem {
    #[serde(flatten)]
    pub mechanic: Mechanic,
    pub distance_km: f64,
}

// ---------------------------------------------------------------------------
// Availability record
// ---------------------------------------------------------------------------

/// POST /api/v1/mechanics
///
/// Register the caller's availability record (created at registration,
/// per the mechanic lifecycle; never deleted afterwards).
pub async fn register_mechanic(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<RegisterMechanicBody>,
) -> AppResult<(StatusCode, Json<DataResponse<Mechanic>>)> {
    authorize(&auth, Permission::RegisterMechanic)?;
    body.validate()?;

    let mechanic = state
        .store
        .mechanics
        .create(auth.user_id, body.name, body.skills)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: mechanic })))
}

/// GET /api/v1/mechanics/me
pub async fn get_own_mechanic(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Mechanic>>> {
    authorize(&auth, Permission::ViewOwnMechanic)?;
    let mechanic = require_own_record(&state, &auth).await?;
    Ok(Json(DataResponse { data: mechanic }))
}

/// GET /api/v1/mechanics/me/offers
///
/// Outstanding offers held by the caller, across breakdowns.
pub async fn get_own_offers(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Offer>>>> {
    authorize(&auth, Permission::ViewOffers)?;
    let mechanic = require_own_record(&state, &auth).await?;

    let offers = state
        .coordinator
        .offer_board()
        .offers_for_mechanic(mechanic.id)
        .await;
    Ok(Json(DataResponse { data: offers }))
}

// ---------------------------------------------------------------------------
// Live pings
// ---------------------------------------------------------------------------

/// PUT /api/v1/mechanics/me/location
///
/// Live location ping from the mechanic themself.
pub async fn update_own_location(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<UpdateLocationBody>,
) -> AppResult<Json<DataResponse<Mechanic>>> {
    authorize(&auth, Permission::UpdateOwnLocation)?;
    body.validate()?;
    let mechanic = require_own_record(&state, &auth).await?;

    let point = GeoPoint::new(body.lat, body.lng)?;
    let updated = state
        .availability
        .update_location(mechanic.id, point, chrono::Utc::now())
        .await?;
    Ok(Json(DataResponse { data: updated }))
}

/// PUT /api/v1/mechanics/me/status
///
/// Toggle ONLINE/OFFLINE. BUSY is owned by dispatch and rejected here.
pub async fn update_own_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<UpdateStatusBody>,
) -> AppResult<Json<DataResponse<Mechanic>>> {
    authorize(&auth, Permission::UpdateOwnAvailability)?;
    let mechanic = require_own_record(&state, &auth).await?;

    let updated = state
        .availability
        .set_status(mechanic.id, body.status)
        .await?;
    Ok(Json(DataResponse { data: updated }))
}

/// PUT /api/v1/mechanics/{id}/status — admin override.
pub async fn admin_update_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateStatusBody>,
) -> AppResult<Json<DataResponse<Mechanic>>> {
    authorize(&auth, Permission::AdminUpdateAvailability)?;

    let updated = state.availability.set_status(id, body.status).await?;
    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// Proximity query
// ---------------------------------------------------------------------------

/// GET /api/v1/mechanics/nearby?lat=&lng=&radius=15
///
/// Public query: ONLINE mechanics within the radius, nearest first.
pub async fn query_nearby(
    State(state): State<AppState>,
    Query(params): Query<NearbyQuery>,
) -> AppResult<Json<DataResponse<Vec<NearbyMechanicItem>>>> {
    params.validate()?;

    let origin = GeoPoint::new(params.lat, params.lng)?;
    let radius_km = params.radius.unwrap_or(DEFAULT_NEARBY_RADIUS_KM);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_NEARBY_LIMIT)
        .min(MAX_NEARBY_LIMIT);

    let hits = state.index.query_nearby(origin, radius_km, limit, &[]).await;

    let mut items = Vec::with_capacity(hits.len());
    for hit in hits {
        // Index entries are kept in step with the store; a missing
        // snapshot means the record vanished mid-query, so skip it.
        if let Some(mechanic) = state.store.mechanics.find_by_id(hit.mechanic_id).await {
            items.push(NearbyMechanicItem {
                mechanic,
                distance_km: hit.distance_km,
            });
        }
    }
    Ok(Json(DataResponse { data: items }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn require_own_record(state: &AppState, auth: &AuthUser) -> Result<Mechanic, AppError> {
    state
        .store
        .mechanics
        .find_by_user(auth.user_id)
        .await
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Mechanic",
                id: auth.user_id,
            })
        })
}
