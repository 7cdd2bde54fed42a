//! Page-based pagination: parameter clamping and the response metadata block.

use serde::Serialize;

/// Default page size for list endpoints.
pub const DEFAULT_LIMIT: i64 = 20;

/// Maximum page size for list endpoints.
pub const MAX_LIMIT: i64 = 100;

/// Pagination metadata attached to every list response.
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

/// Clamp a requested page number to `>= 1`.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Clamp a requested page size into `[1, MAX_LIMIT]`.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Zero-based offset of the first item on `page`.
pub fn offset(page: i64, limit: i64) -> usize {
    ((page - 1) * limit) as usize
}
