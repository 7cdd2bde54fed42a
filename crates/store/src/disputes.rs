//! Repository for disputes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use wayside_core::dispute::{Dispute, DisputePriority, DisputeStatus, RelatedType};
use wayside_core::error::CoreError;
use wayside_core::pagination;
use wayside_core::types::DbId;

/// Typed filter for dispute listing. Each recognized option and its
/// effect:
///
/// - `status` / `priority`: exact match.
/// - `raised_by`: exact match on the raising user.
/// - `search`: case-insensitive substring on reason or description.
#[derive(Debug, Default, Clone)]
pub struct DisputeFilter {
    pub status: Option<DisputeStatus>,
    pub priority: Option<DisputePriority>,
    pub raised_by: Option<DbId>,
    pub search: Option<String>,
}

impl DisputeFilter {
    fn matches(&self, d: &Dispute) -> bool {
        if let Some(status) = self.status {
            if d.status != status {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if d.priority != priority {
                return false;
            }
        }
        if let Some(raised_by) = self.raised_by {
            if d.raised_by != raised_by {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !d.reason.to_lowercase().contains(&needle)
                && !d.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// In-memory dispute store.
#[derive(Default)]
pub struct DisputeRepo {
    entries: RwLock<HashMap<DbId, Arc<RwLock<Dispute>>>>,
    next_id: AtomicI64,
}

impl DisputeRepo {
    /// Open a new dispute.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        related_id: DbId,
        related_type: RelatedType,
        raised_by: DbId,
        reason: String,
        description: String,
        priority: DisputePriority,
    ) -> Dispute {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let dispute = Dispute::new(
            id,
            related_id,
            related_type,
            raised_by,
            reason,
            description,
            priority,
            chrono::Utc::now(),
        );
        self.entries
            .write()
            .await
            .insert(id, Arc::new(RwLock::new(dispute.clone())));
        dispute
    }

    /// Find a dispute by id.
    pub async fn find_by_id(&self, id: DbId) -> Option<Dispute> {
        let entry = self.entry(id).await?;
        let guard = entry.read().await;
        Some(guard.clone())
    }

    /// Like [`find_by_id`](Self::find_by_id) but mapping absence to `NotFound`.
    pub async fn get(&self, id: DbId) -> Result<Dispute, CoreError> {
        self.find_by_id(id).await.ok_or(CoreError::NotFound {
            entity: "Dispute",
            id,
        })
    }

    /// List disputes matching `filter`, newest first, paginated.
    pub async fn list_filtered(
        &self,
        filter: &DisputeFilter,
        page: i64,
        limit: i64,
    ) -> (Vec<Dispute>, i64) {
        let entries: Vec<Arc<RwLock<Dispute>>> =
            self.entries.read().await.values().cloned().collect();

        let mut matched = Vec::new();
        for entry in entries {
            let guard = entry.read().await;
            if filter.matches(&guard) {
                matched.push(guard.clone());
            }
        }
        matched.sort_by(|a, b| b.id.cmp(&a.id));

        let total = matched.len() as i64;
        let page_items = matched
            .into_iter()
            .skip(pagination::offset(page, limit))
            .take(limit as usize)
            .collect();
        (page_items, total)
    }

    /// Resolve a dispute under its entry lock.
    ///
    /// The OPEN check and the mutation are atomic, so a second resolver
    /// always observes `Conflict` rather than overwriting the first
    /// ruling.
    pub async fn resolve(
        &self,
        id: DbId,
        resolution: &str,
        final_status: DisputeStatus,
    ) -> Result<Dispute, CoreError> {
        let entry = self.entry(id).await.ok_or(CoreError::NotFound {
            entity: "Dispute",
            id,
        })?;
        let mut guard = entry.write().await;
        guard.resolve(resolution, final_status, chrono::Utc::now())?;
        Ok(guard.clone())
    }

    async fn entry(&self, id: DbId) -> Option<Arc<RwLock<Dispute>>> {
        self.entries.read().await.get(&id).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
