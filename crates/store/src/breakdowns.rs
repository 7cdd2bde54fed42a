//! Repository for breakdown requests.
//!
//! Records live behind per-entry `RwLock`s; every mutation happens under
//! the entry's write lock, so a status check plus the mutation it guards
//! is atomic (compare-and-set semantics). The map-level lock is held only
//! long enough to resolve an id to its entry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use wayside_core::breakdown::{
    BreakdownRequest, BreakdownStatus, EmergencyCategory, StatusChange,
};
use wayside_core::error::CoreError;
use wayside_core::geo::GeoPoint;
use wayside_core::pagination;
use wayside_core::types::DbId;

/// Typed filter for breakdown listing. Each recognized option and its
/// effect:
///
/// - `status`: exact match.
/// - `rider_id` / `mechanic_id`: exact match on the bound party.
/// - `search`: case-insensitive substring on the display id.
#[derive(Debug, Default, Clone)]
pub struct BreakdownFilter {
    pub status: Option<BreakdownStatus>,
    pub rider_id: Option<DbId>,
    pub mechanic_id: Option<DbId>,
    pub search: Option<String>,
}

impl BreakdownFilter {
    fn matches(&self, b: &BreakdownRequest) -> bool {
        if let Some(status) = self.status {
            if b.status != status {
                return false;
            }
        }
        if let Some(rider_id) = self.rider_id {
            if b.rider_id != rider_id {
                return false;
            }
        }
        if let Some(mechanic_id) = self.mechanic_id {
            if b.mechanic_id != Some(mechanic_id) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !b.display_id.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// In-memory breakdown store with per-entry locking.
#[derive(Default)]
pub struct BreakdownRepo {
    entries: RwLock<HashMap<DbId, Arc<RwLock<BreakdownRequest>>>>,
    next_id: AtomicI64,
}

impl BreakdownRepo {
    /// Create a new request (status PENDING), returning the full record.
    pub async fn create(
        &self,
        rider_id: DbId,
        location: GeoPoint,
        address: Option<String>,
        category: EmergencyCategory,
        notes: Option<String>,
    ) -> BreakdownRequest {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let record = BreakdownRequest::new(
            id,
            rider_id,
            location,
            address,
            category,
            notes,
            chrono::Utc::now(),
        );
        self.entries
            .write()
            .await
            .insert(id, Arc::new(RwLock::new(record.clone())));
        record
    }

    /// Find a breakdown by id.
    pub async fn find_by_id(&self, id: DbId) -> Option<BreakdownRequest> {
        let entry = self.entry(id).await?;
        let guard = entry.read().await;
        Some(guard.clone())
    }

    /// Like [`find_by_id`](Self::find_by_id) but mapping absence to `NotFound`.
    pub async fn get(&self, id: DbId) -> Result<BreakdownRequest, CoreError> {
        self.find_by_id(id)
            .await
            .ok_or(CoreError::NotFound {
                entity: "Breakdown",
                id,
            })
    }

    /// List breakdowns matching `filter`, newest first, paginated.
    ///
    /// Returns the page of records plus the total match count.
    pub async fn list_filtered(
        &self,
        filter: &BreakdownFilter,
        page: i64,
        limit: i64,
    ) -> (Vec<BreakdownRequest>, i64) {
        let entries: Vec<Arc<RwLock<BreakdownRequest>>> =
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

    /// Apply an arbitrary atomic mutation to a record.
    ///
    /// `f` runs against a scratch copy under the entry's write lock and
    /// is committed only if it returns `Ok`, so a failed mutation leaves
    /// the stored record exactly as it was. Returns the updated record.
    pub async fn mutate<F>(&self, id: DbId, f: F) -> Result<BreakdownRequest, CoreError>
    where
        F: FnOnce(&mut BreakdownRequest) -> Result<(), CoreError>,
    {
        let entry = self.entry(id).await.ok_or(CoreError::NotFound {
            entity: "Breakdown",
            id,
        })?;
        let mut guard = entry.write().await;
        let mut scratch = guard.clone();
        f(&mut scratch)?;
        *guard = scratch.clone();
        Ok(scratch)
    }

    /// Compare-and-set status transition.
    ///
    /// Fails with `Conflict` if the record is no longer in `expected`
    /// when the entry lock is acquired — the caller lost a race and can
    /// decide, from the current status, whether to retry or give up.
    pub async fn transition(
        &self,
        id: DbId,
        expected: BreakdownStatus,
        target: BreakdownStatus,
        change: StatusChange,
    ) -> Result<BreakdownRequest, CoreError> {
        self.mutate(id, |b| {
            if b.status != expected {
                return Err(CoreError::Conflict(format!(
                    "breakdown {} is {}, expected {}",
                    b.display_id, b.status, expected
                )));
            }
            b.transition(target, change, chrono::Utc::now())
        })
        .await
    }

    async fn entry(&self, id: DbId) -> Option<Arc<RwLock<BreakdownRequest>>> {
        self.entries.read().await.get(&id).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
