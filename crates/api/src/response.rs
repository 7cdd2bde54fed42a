//! Shared response envelope types for API handlers.
//!
//! Single entities travel in a `{ "data": ... }` envelope; list
//! endpoints return `{ "items": [...], "pagination": {...} }`.

use serde::Serialize;
use wayside_core::pagination::Pagination;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Standard list envelope with pagination metadata.
#[derive(Debug, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(items: Vec<T>, page: i64, limit: i64, total: i64) -> Self {
        Self {
            items,
            pagination: Pagination::new(page, limit, total),
        }
    }
}
