//! Repository for mechanic availability records.
//!
//! Each mechanic's availability status lives in an `AtomicU8`, so
//! reservation (`ONLINE -> BUSY`) is a single compare-and-swap:
//! linearizable per mechanic, no lock shared between mechanics. Profile
//! and location sit behind per-entry `RwLock`s.
//!
//! Records are never deleted; OFFLINE is the deactivated form.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use wayside_core::error::CoreError;
use wayside_core::geo::GeoPoint;
use wayside_core::mechanic::{Mechanic, MechanicStatus};
use wayside_core::types::{DbId, Timestamp};

struct Profile {
    name: String,
    skills: Vec<String>,
    verified: bool,
}

struct LastLocation {
    point: GeoPoint,
    updated_at: Timestamp,
}

struct MechanicEntry {
    id: DbId,
    user_id: DbId,
    created_at: Timestamp,
    status: AtomicU8,
    profile: RwLock<Profile>,
    location: RwLock<Option<LastLocation>>,
}

impl MechanicEntry {
    async fn snapshot(&self) -> Mechanic {
        let status = MechanicStatus::from_u8(self.status.load(Ordering::Acquire));
        let profile = self.profile.read().await;
        let location = self.location.read().await;
        Mechanic {
            id: self.id,
            user_id: self.user_id,
            name: profile.name.clone(),
            skills: profile.skills.clone(),
            verified: profile.verified,
            status,
            is_online: status.is_online(),
            location: location.as_ref().map(|l| l.point),
            location_updated_at: location.as_ref().map(|l| l.updated_at),
            created_at: self.created_at,
        }
    }
}

/// In-memory mechanic store with per-mechanic atomic availability.
#[derive(Default)]
pub struct MechanicRepo {
    entries: RwLock<HashMap<DbId, Arc<MechanicEntry>>>,
    by_user: RwLock<HashMap<DbId, DbId>>,
    next_id: AtomicI64,
}

impl MechanicRepo {
    /// Register an availability record for a user. One record per user;
    /// a second registration fails with `Conflict`.
    ///
    /// New mechanics start OFFLINE and unverified.
    pub async fn create(
        &self,
        user_id: DbId,
        name: String,
        skills: Vec<String>,
    ) -> Result<Mechanic, CoreError> {
        let mut by_user = self.by_user.write().await;
        if by_user.contains_key(&user_id) {
            return Err(CoreError::Conflict(format!(
                "user {user_id} already has a mechanic record"
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let entry = Arc::new(MechanicEntry {
            id,
            user_id,
            created_at: chrono::Utc::now(),
            status: AtomicU8::new(MechanicStatus::Offline.as_u8()),
            profile: RwLock::new(Profile {
                name,
                skills,
                verified: false,
            }),
            location: RwLock::new(None),
        });
        let snapshot = entry.snapshot().await;

        self.entries.write().await.insert(id, entry);
        by_user.insert(user_id, id);
        Ok(snapshot)
    }

    /// Find a mechanic by id.
    pub async fn find_by_id(&self, id: DbId) -> Option<Mechanic> {
        let entry = self.entry(id).await?;
        Some(entry.snapshot().await)
    }

    /// Like [`find_by_id`](Self::find_by_id) but mapping absence to `NotFound`.
    pub async fn get(&self, id: DbId) -> Result<Mechanic, CoreError> {
        self.find_by_id(id).await.ok_or(CoreError::NotFound {
            entity: "Mechanic",
            id,
        })
    }

    /// Find the mechanic record owned by a platform user.
    pub async fn find_by_user(&self, user_id: DbId) -> Option<Mechanic> {
        let id = *self.by_user.read().await.get(&user_id)?;
        self.find_by_id(id).await
    }

    /// Record a live location ping, returning the updated snapshot.
    pub async fn update_location(
        &self,
        id: DbId,
        point: GeoPoint,
        observed_at: Timestamp,
    ) -> Result<Mechanic, CoreError> {
        let entry = self.entry(id).await.ok_or(CoreError::NotFound {
            entity: "Mechanic",
            id,
        })?;
        *entry.location.write().await = Some(LastLocation {
            point,
            updated_at: observed_at,
        });
        Ok(entry.snapshot().await)
    }

    /// Current availability status.
    pub async fn load_status(&self, id: DbId) -> Result<MechanicStatus, CoreError> {
        let entry = self.entry(id).await.ok_or(CoreError::NotFound {
            entity: "Mechanic",
            id,
        })?;
        Ok(MechanicStatus::from_u8(entry.status.load(Ordering::Acquire)))
    }

    /// Atomically swap the availability status if it currently equals
    /// `expected`. Returns whether the swap happened.
    ///
    /// This is the exclusivity gate: of N concurrent
    /// `compare_and_set_status(id, ONLINE, BUSY)` calls, exactly one
    /// returns `true`.
    pub async fn compare_and_set_status(
        &self,
        id: DbId,
        expected: MechanicStatus,
        next: MechanicStatus,
    ) -> Result<bool, CoreError> {
        let entry = self.entry(id).await.ok_or(CoreError::NotFound {
            entity: "Mechanic",
            id,
        })?;
        Ok(entry
            .status
            .compare_exchange(
                expected.as_u8(),
                next.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok())
    }

    /// Skills advertised by a mechanic (used by the geospatial index).
    pub async fn skills(&self, id: DbId) -> Result<Vec<String>, CoreError> {
        let entry = self.entry(id).await.ok_or(CoreError::NotFound {
            entity: "Mechanic",
            id,
        })?;
        let profile = entry.profile.read().await;
        Ok(profile.skills.clone())
    }

    async fn entry(&self, id: DbId) -> Option<Arc<MechanicEntry>> {
        self.entries.read().await.get(&id).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_starts_offline_and_unverified() {
        let repo = MechanicRepo::default();
        let m = repo
            .create(10, "Lou".into(), vec!["battery".into()])
            .await
            .unwrap();
        assert_eq!(m.status, MechanicStatus::Offline);
        assert!(!m.is_online);
        assert!(!m.verified);
        assert!(m.location.is_none());
    }

    #[tokio::test]
    async fn one_record_per_user() {
        let repo = MechanicRepo::default();
        repo.create(10, "Lou".into(), vec![]).await.unwrap();
        let err = repo.create(10, "Lou again".into(), vec![]).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert!(repo.find_by_user(10).await.is_some());
    }

    #[tokio::test]
    async fn cas_swaps_only_from_expected() {
        let repo = MechanicRepo::default();
        let m = repo.create(10, "Lou".into(), vec![]).await.unwrap();

        // OFFLINE -> BUSY must not happen via an ONLINE expectation.
        let swapped = repo
            .compare_and_set_status(m.id, MechanicStatus::Online, MechanicStatus::Busy)
            .await
            .unwrap();
        assert!(!swapped);

        repo.compare_and_set_status(m.id, MechanicStatus::Offline, MechanicStatus::Online)
            .await
            .unwrap();
        let swapped = repo
            .compare_and_set_status(m.id, MechanicStatus::Online, MechanicStatus::Busy)
            .await
            .unwrap();
        assert!(swapped);
        assert_eq!(
            repo.load_status(m.id).await.unwrap(),
            MechanicStatus::Busy
        );
    }

    #[tokio::test]
    async fn concurrent_reservations_yield_exactly_one_winner() {
        let repo = Arc::new(MechanicRepo::default());
        let m = repo.create(10, "Lou".into(), vec![]).await.unwrap();
        repo.compare_and_set_status(m.id, MechanicStatus::Offline, MechanicStatus::Online)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = Arc::clone(&repo);
            let id = m.id;
            handles.push(tokio::spawn(async move {
                repo.compare_and_set_status(id, MechanicStatus::Online, MechanicStatus::Busy)
                    .await
                    .unwrap()
            }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1, "exactly one concurrent reservation must win");
    }

    #[tokio::test]
    async fn snapshot_is_online_tracks_status() {
        let repo = MechanicRepo::default();
        let m = repo.create(10, "Lou".into(), vec![]).await.unwrap();
        repo.compare_and_set_status(m.id, MechanicStatus::Offline, MechanicStatus::Online)
            .await
            .unwrap();

        let snap = repo.get(m.id).await.unwrap();
        assert_eq!(snap.status, MechanicStatus::Online);
        assert!(snap.is_online);
    }

    #[tokio::test]
    async fn location_ping_updates_snapshot() {
        let repo = MechanicRepo::default();
        let m = repo.create(10, "Lou".into(), vec![]).await.unwrap();

        let point = GeoPoint::new(45.0, -93.2).unwrap();
        let snap = repo
            .update_location(m.id, point, chrono::Utc::now())
            .await
            .unwrap();
        assert_eq!(snap.location, Some(point));
        assert!(snap.location_updated_at.is_some());
    }
}
