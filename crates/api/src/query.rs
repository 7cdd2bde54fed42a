//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Generic page-based pagination parameters (`?page=&limit=`).
///
/// Values are clamped via `wayside_core::pagination`.
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
