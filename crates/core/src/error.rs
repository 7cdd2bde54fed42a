use crate::types::DbId;

/// Domain-level error taxonomy shared by every crate in the workspace.
///
/// The API layer maps these onto HTTP statuses; see `wayside-api`.
/// `Conflict` is deliberately distinct from `Validation`: a caller that
/// loses an assignment race can retry with a fresh candidate, while a
/// validation failure never succeeds on retry.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
