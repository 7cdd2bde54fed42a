//! Handlers for the `/breakdowns` resource: request creation, lifecycle
//! movement, offer acceptance, and photos.
//!
//! Every status mutation funnels through the dispatch coordinator; the
//! handlers only authenticate, authorize, and check ownership.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;
use wayside_core::breakdown::{
    BreakdownRequest, BreakdownStatus, EmergencyCategory, PhotoRef, StatusChange,
};
use wayside_core::error::CoreError;
use wayside_core::geo::GeoPoint;
use wayside_core::pagination::{clamp_limit, clamp_page};
use wayside_core::roles::{ROLE_ADMIN, ROLE_MECHANIC, ROLE_RIDER};
use wayside_core::types::DbId;
use wayside_store::BreakdownFilter;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::policy::{authorize, Permission};
use crate::response::{DataResponse, ListResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body for `POST /breakdowns`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBreakdownBody {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    pub category: EmergencyCategory,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Body for `PATCH /breakdowns/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: BreakdownStatus,
    pub estimated_price: Option<i64>,
    pub final_price: Option<i64>,
}

/// Query parameters for `GET /breakdowns`.
#[derive(Debug, Deserialize)]
pub struct BreakdownListQuery {
    pub status: Option<BreakdownStatus>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// CRUD + lifecycle
// ---------------------------------------------------------------------------

/// POST /api/v1/breakdowns
///
/// Create a breakdown request and start dispatching it. Returns the
/// record already in SEARCHING.
pub async fn create_breakdown(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateBreakdownBody>,
) -> AppResult<(StatusCode, Json<DataResponse<BreakdownRequest>>)> {
    authorize(&auth, Permission::CreateBreakdown)?;
    body.validate()?;

    let location = GeoPoint::new(body.lat, body.lng)?;
    let created = state
        .coordinator
        .create_request(auth.user_id, location, body.address, body.category, body.notes)
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/breakdowns
///
/// List breakdowns visible to the caller: riders see their own,
/// mechanics the ones assigned to them, admins everything.
pub async fn list_breakdowns(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<BreakdownListQuery>,
) -> AppResult<Json<ListResponse<BreakdownRequest>>> {
    authorize(&auth, Permission::ListBreakdowns)?;

    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit);

    let mut filter = BreakdownFilter {
        status: params.status,
        search: params.search,
        ..Default::default()
    };
    match auth.role.as_str() {
        ROLE_RIDER => filter.rider_id = Some(auth.user_id),
        ROLE_MECHANIC => {
            let Some(mechanic) = state.store.mechanics.find_by_user(auth.user_id).await else {
                return Ok(Json(ListResponse::new(Vec::new(), page, limit, 0)));
            };
            filter.mechanic_id = Some(mechanic.id);
        }
        _ => {}
    }

    let (items, total) = state
        .store
        .breakdowns
        .list_filtered(&filter, page, limit)
        .await;
    Ok(Json(ListResponse::new(items, page, limit, total)))
}

/// GET /api/v1/breakdowns/{id}
pub async fn get_breakdown(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BreakdownRequest>>> {
    authorize(&auth, Permission::ViewBreakdown)?;

    let record = state.store.breakdowns.get(id).await?;
    ensure_party(&auth, &state, &record).await?;
    Ok(Json(DataResponse { data: record }))
}

/// PATCH /api/v1/breakdowns/{id}/status
///
/// Move the lifecycle forward (EN_ROUTE through COMPLETED). Only the
/// assigned mechanic or an admin; invalid targets are rejected with 400.
pub async fn update_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateStatusBody>,
) -> AppResult<Json<DataResponse<BreakdownRequest>>> {
    authorize(&auth, Permission::UpdateBreakdownStatus)?;

    if auth.role == ROLE_MECHANIC {
        let record = state.store.breakdowns.get(id).await?;
        let mechanic = state
            .store
            .mechanics
            .find_by_user(auth.user_id)
            .await
            .ok_or(CoreError::NotFound {
                entity: "Mechanic",
                id: auth.user_id,
            })?;
        if record.mechanic_id != Some(mechanic.id) {
            return Err(AppError::Core(CoreError::Forbidden(
                "only the assigned mechanic may update this breakdown".into(),
            )));
        }
    }

    let updated = state
        .coordinator
        .advance_status(
            id,
            body.status,
            StatusChange {
                estimated_price: body.estimated_price,
                final_price: body.final_price,
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(DataResponse { data: updated }))
}

/// POST /api/v1/breakdowns/{id}/cancel
///
/// Riders may cancel their own request while it is PENDING or SEARCHING;
/// admins may force-cancel any non-terminal breakdown.
pub async fn cancel_breakdown(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BreakdownRequest>>> {
    let updated = if auth.role == ROLE_ADMIN {
        authorize(&auth, Permission::ForceCancelBreakdown)?;
        state.coordinator.force_cancel(id, auth.user_id).await?
    } else {
        authorize(&auth, Permission::CancelBreakdown)?;
        state.coordinator.cancel_by_rider(id, auth.user_id).await?
    };
    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// Offers
// ---------------------------------------------------------------------------

/// POST /api/v1/breakdowns/{id}/accept
///
/// A mechanic accepts an outstanding offer. First acceptance processed
/// wins; later ones observe 409.
pub async fn accept_offer(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BreakdownRequest>>> {
    authorize(&auth, Permission::AcceptOffer)?;
    let mechanic = require_mechanic(&state, &auth).await?;

    let updated = state.coordinator.accept(id, mechanic.id).await?;
    Ok(Json(DataResponse { data: updated }))
}

/// POST /api/v1/breakdowns/{id}/decline
pub async fn decline_offer(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    authorize(&auth, Permission::DeclineOffer)?;
    let mechanic = require_mechanic(&state, &auth).await?;

    state.coordinator.decline(id, mechanic.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Photos
// ---------------------------------------------------------------------------

/// POST /api/v1/breakdowns/{id}/photos
///
/// Multipart upload of one or more photos, stored through the blob
/// capability and appended to the record in upload order. Rejected once
/// the breakdown is terminal.
pub async fn attach_photos(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<BreakdownRequest>>> {
    authorize(&auth, Permission::AttachPhoto)?;

    let record = state.store.breakdowns.get(id).await?;
    if record.rider_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "only the requesting rider may attach photos".into(),
        )));
    }

    let mut photos: Vec<PhotoRef> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {e}")))?
    {
        let file_name = field
            .file_name()
            .map(sanitize_file_name)
            .unwrap_or_else(|| "photo.jpg".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
        if bytes.is_empty() {
            continue;
        }

        let blob = state
            .blobs
            .store(&file_name, bytes.to_vec())
            .await
            .map_err(|e| AppError::InternalError(format!("Blob storage failed: {e}")))?;
        photos.push(PhotoRef {
            id: blob.id,
            file_name,
            url: blob.url,
            uploaded_at: chrono::Utc::now(),
        });
    }

    if photos.is_empty() {
        return Err(AppError::BadRequest(
            "No files received in multipart upload".to_string(),
        ));
    }

    let updated = state
        .store
        .breakdowns
        .mutate(id, |b| {
            if b.status.is_terminal() {
                return Err(CoreError::Conflict(format!(
                    "breakdown {} is {} and immutable",
                    b.display_id, b.status
                )));
            }
            b.photos.extend(photos);
            Ok(())
        })
        .await?;
    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// 403 unless the caller is the owning rider, the assigned mechanic, or
/// an admin.
async fn ensure_party(
    auth: &AuthUser,
    state: &AppState,
    record: &BreakdownRequest,
) -> Result<(), AppError> {
    if auth.role == ROLE_ADMIN || record.rider_id == auth.user_id {
        return Ok(());
    }
    if auth.role == ROLE_MECHANIC {
        if let Some(mechanic) = state.store.mechanics.find_by_user(auth.user_id).await {
            if record.mechanic_id == Some(mechanic.id) {
                return Ok(());
            }
        }
    }
    Err(AppError::Core(CoreError::Forbidden(
        "not a party to this breakdown".into(),
    )))
}

/// Resolve the caller's mechanic record.
async fn require_mechanic(
    state: &AppState,
    auth: &AuthUser,
) -> Result<wayside_core::mechanic::Mechanic, AppError> {
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

/// Strip path separators from client-supplied file names.
fn sanitize_file_name(name: &str) -> String {
    name.rsplit(['/', '\\']).next().unwrap_or("photo.jpg").to_string()
}
