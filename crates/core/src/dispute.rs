//! Dispute/escalation records and their resolution rules.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    Open,
    Resolved,
    Closed,
}

impl DisputeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputePriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// What kind of record the dispute is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelatedType {
    Breakdown,
    Order,
}

/// A dispute raised against a breakdown or marketplace order.
///
/// Invariant: `resolution` is non-empty exactly when the status is
/// RESOLVED or CLOSED.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DbId,
    pub related_id: DbId,
    pub related_type: RelatedType,
    pub raised_by: DbId,
    pub reason: String,
    pub description: String,
    pub priority: DisputePriority,
    pub status: DisputeStatus,
    pub resolution: Option<String>,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

impl Dispute {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: DbId,
        related_id: DbId,
        related_type: RelatedType,
        raised_by: DbId,
        reason: String,
        description: String,
        priority: DisputePriority,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            related_id,
            related_type,
            raised_by,
            reason,
            description,
            priority,
            status: DisputeStatus::Open,
            resolution: None,
            created_at: now,
            resolved_at: None,
        }
    }

    /// Close out the dispute.
    ///
    /// Permitted only while OPEN; a second call fails with `Conflict` and
    /// leaves the original resolution untouched. `final_status` must be
    /// RESOLVED or CLOSED, and the resolution text must be non-empty.
    ///
    /// Resolving never mutates the referenced breakdown or order.
    pub fn resolve(
        &mut self,
        resolution: &str,
        final_status: DisputeStatus,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        if final_status == DisputeStatus::Open {
            return Err(CoreError::Validation(
                "final status must be RESOLVED or CLOSED".into(),
            ));
        }
        if resolution.trim().is_empty() {
            return Err(CoreError::Validation(
                "resolution text must not be empty".into(),
            ));
        }
        if self.status != DisputeStatus::Open {
            return Err(CoreError::Conflict(format!(
                "dispute {} already resolved",
                self.id
            )));
        }

        self.status = final_status;
        self.resolution = Some(resolution.trim().to_string());
        self.resolved_at = Some(now);
        Ok(())
    }
}
