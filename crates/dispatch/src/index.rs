//! Geospatial index over mechanic positions.
//!
//! Positions are partitioned into fixed-size grid cells so a proximity
//! query touches only the cells overlapping the search radius instead of
//! scanning the whole population. The bucketing is invisible to callers;
//! a different partitioning (or a plain scan) can replace it behind the
//! same contract.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use wayside_core::geo::{haversine_km, GeoPoint};
use wayside_core::types::{DbId, Timestamp};

/// Kilometres per degree of latitude (and of longitude at the equator).
const KM_PER_DEGREE: f64 = 111.2;

/// Grid cell side length in degrees (~28 km of latitude), sized to the
/// default 15 km search radius so most queries touch at most 4 cells.
const CELL_SIZE_DEG: f64 = 0.25;

type CellKey = (i32, i32);

fn cell_of(point: GeoPoint) -> CellKey {
    (
        (point.lat / CELL_SIZE_DEG).floor() as i32,
        (point.lng / CELL_SIZE_DEG).floor() as i32,
    )
}

struct IndexEntry {
    point: GeoPoint,
    observed_at: Timestamp,
    /// Mirrors "status == ONLINE"; ineligible entries keep their position
    /// history but are never returned by queries.
    available: bool,
    skills: Vec<String>,
}

#[derive(Default)]
struct IndexInner {
    entries: HashMap<DbId, IndexEntry>,
    cells: HashMap<CellKey, HashSet<DbId>>,
}

/// A candidate returned by a proximity query.
#[derive(Debug, Clone)]
pub struct NearbyMechanic {
    pub mechanic_id: DbId,
    pub distance_km: f64,
    pub observed_at: Timestamp,
}

/// Grid-bucketed position index; interior-locked, shared via `Arc`.
#[derive(Default)]
pub struct GeospatialIndex {
    inner: RwLock<IndexInner>,
}

impl GeospatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a mechanic's last-known position (and advertised skills).
    pub async fn upsert(
        &self,
        mechanic_id: DbId,
        point: GeoPoint,
        observed_at: Timestamp,
        skills: Vec<String>,
        available: bool,
    ) {
        let mut inner = self.inner.write().await;
        let new_cell = cell_of(point);

        let old_cell = inner.entries.get(&mechanic_id).map(|e| cell_of(e.point));
        if let Some(old_cell) = old_cell {
            if old_cell != new_cell {
                if let Some(ids) = inner.cells.get_mut(&old_cell) {
                    ids.remove(&mechanic_id);
                }
            }
        }

        inner.entries.insert(
            mechanic_id,
            IndexEntry {
                point,
                observed_at,
                available,
                skills,
            },
        );
        inner.cells.entry(new_cell).or_default().insert(mechanic_id);
    }

    /// Toggle query eligibility without touching position history.
    ///
    /// Returns false if the mechanic has never reported a position.
    pub async fn set_available(&self, mechanic_id: DbId, available: bool) -> bool {
        let mut inner = self.inner.write().await;
        match inner.entries.get_mut(&mechanic_id) {
            Some(entry) => {
                entry.available = available;
                true
            }
            None => false,
        }
    }

    /// Eligible mechanics within `radius_km` of `origin`, ascending by
    /// great-circle distance, ties broken by most-recent `observed_at`
    /// first, truncated to `max_results`.
    ///
    /// `required_skills` restricts candidates to those advertising every
    /// named skill (exact match); pass `&[]` for no restriction.
    pub async fn query_nearby(
        &self,
        origin: GeoPoint,
        radius_km: f64,
        max_results: usize,
        required_skills: &[String],
    ) -> Vec<NearbyMechanic> {
        let inner = self.inner.read().await;

        // Bounding box of cells that can contain a point within the radius.
        // No wrap handling at the antimeridian; breakdown coverage areas
        // are city-scale.
        let lat_delta = radius_km / KM_PER_DEGREE;
        let lng_delta = radius_km / (KM_PER_DEGREE * origin.lat.to_radians().cos().abs().max(0.01));
        let lat_min = ((origin.lat - lat_delta) / CELL_SIZE_DEG).floor() as i32;
        let lat_max = ((origin.lat + lat_delta) / CELL_SIZE_DEG).floor() as i32;
        let lng_min = ((origin.lng - lng_delta) / CELL_SIZE_DEG).floor() as i32;
        let lng_max = ((origin.lng + lng_delta) / CELL_SIZE_DEG).floor() as i32;

        let mut results: Vec<NearbyMechanic> = Vec::new();
        for cell_lat in lat_min..=lat_max {
            for cell_lng in lng_min..=lng_max {
                let Some(ids) = inner.cells.get(&(cell_lat, cell_lng)) else {
                    continue;
                };
                for id in ids {
                    let Some(entry) = inner.entries.get(id) else {
                        continue;
                    };
                    if !entry.available {
                        continue;
                    }
                    if !required_skills
                        .iter()
                        .all(|s| entry.skills.iter().any(|have| have == s))
                    {
                        continue;
                    }
                    let distance_km = haversine_km(origin, entry.point);
                    if distance_km <= radius_km {
                        results.push(NearbyMechanic {
                            mechanic_id: *id,
                            distance_km,
                            observed_at: entry.observed_at,
                        });
                    }
                }
            }
        }

        results.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.observed_at.cmp(&a.observed_at))
        });
        results.truncate(max_results);
        results
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
