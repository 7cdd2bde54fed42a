//! Handlers for the `/disputes` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;
use wayside_core::dispute::{Dispute, DisputePriority, DisputeStatus, RelatedType};
use wayside_core::error::CoreError;
use wayside_core::pagination::{clamp_limit, clamp_page};
use wayside_core::roles::ROLE_ADMIN;
use wayside_core::types::DbId;
use wayside_events::{names, PlatformEvent};
use wayside_store::DisputeFilter;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::policy::{authorize, Permission};
use crate::response::{DataResponse, ListResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body for `POST /disputes`.
#[derive(Debug, Deserialize, Validate)]
pub struct RaiseDisputeBody {
    pub related_id: DbId,
    pub related_type: RelatedType,
    #[validate(length(min = 1, max = 200))]
    pub reason: String,
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
    pub priority: Option<DisputePriority>,
}

/// Body for `POST /disputes/{id}/resolve`.
#[derive(Debug, Deserialize, Validate)]
pub struct ResolveDisputeBody {
    #[validate(length(min = 1, max = 2000))]
    pub resolution: String,
    /// RESOLVED or CLOSED.
    pub status: DisputeStatus,
}

/// Query parameters for `GET /disputes`.
#[derive(Debug, Deserialize)]
pub struct DisputeListQuery {
    pub status: Option<DisputeStatus>,
    pub priority: Option<DisputePriority>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/disputes
///
/// Any authenticated party may raise a dispute against an existing
/// breakdown (or a marketplace order, referenced by id only).
pub async fn raise_dispute(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<RaiseDisputeBody>,
) -> AppResult<(StatusCode, Json<DataResponse<Dispute>>)> {
    authorize(&auth, Permission::RaiseDispute)?;
    body.validate()?;

    // Orders live in the marketplace service; only breakdown references
    // can be checked for existence here.
    if body.related_type == RelatedType::Breakdown {
        state.store.breakdowns.get(body.related_id).await?;
    }

    let dispute = state
        .store
        .disputes
        .create(
            body.related_id,
            body.related_type,
            auth.user_id,
            body.reason,
            body.description,
            body.priority.unwrap_or(DisputePriority::Medium),
        )
        .await;

    state.bus.publish(
        PlatformEvent::new(names::DISPUTE_RAISED)
            .with_source("dispute", dispute.id)
            .with_actor(auth.user_id)
            .with_payload(serde_json::json!({
                "raised_by": auth.user_id,
                "related_type": dispute.related_type,
                "related_id": dispute.related_id,
            })),
    );
    tracing::info!(dispute_id = dispute.id, raised_by = auth.user_id, "Dispute raised");

    Ok((StatusCode::CREATED, Json(DataResponse { data: dispute })))
}

/// GET /api/v1/disputes
///
/// Admins see every dispute; everyone else sees the ones they raised.
pub async fn list_disputes(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<DisputeListQuery>,
) -> AppResult<Json<ListResponse<Dispute>>> {
    authorize(&auth, Permission::ListDisputes)?;

    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit);

    let mut filter = DisputeFilter {
        status: params.status,
        priority: params.priority,
        search: params.search,
        ..Default::default()
    };
    if auth.role != ROLE_ADMIN {
        filter.raised_by = Some(auth.user_id);
    }

    let (items, total) = state
        .store
        .disputes
        .list_filtered(&filter, page, limit)
        .await;
    Ok(Json(ListResponse::new(items, page, limit, total)))
}

/// GET /api/v1/disputes/{id}
pub async fn get_dispute(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Dispute>>> {
    authorize(&auth, Permission::ViewDispute)?;

    let dispute = state.store.disputes.get(id).await?;
    if auth.role != ROLE_ADMIN && dispute.raised_by != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "not a party to this dispute".into(),
        )));
    }
    Ok(Json(DataResponse { data: dispute }))
}

/// POST /api/v1/disputes/{id}/resolve
///
/// Admin only; permitted once while OPEN. Resolving never mutates the
/// referenced breakdown or order.
pub async fn resolve_dispute(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<ResolveDisputeBody>,
) -> AppResult<Json<DataResponse<Dispute>>> {
    authorize(&auth, Permission::ResolveDispute)?;
    body.validate()?;

    let resolved = state
        .store
        .disputes
        .resolve(id, &body.resolution, body.status)
        .await?;

    state.bus.publish(
        PlatformEvent::new(names::DISPUTE_RESOLVED)
            .with_source("dispute", resolved.id)
            .with_actor(auth.user_id)
            .with_payload(serde_json::json!({
                "raised_by": resolved.raised_by,
                "final_status": resolved.status,
            })),
    );
    tracing::info!(dispute_id = id, resolver = auth.user_id, "Dispute resolved");

    Ok(Json(DataResponse { data: resolved }))
}
